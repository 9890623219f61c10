use std::path::Path;

use assert_cmd::Command;

pub fn decl_cmd() -> Command {
	let mut cmd = Command::new(env!("CARGO_BIN_EXE_decl"));
	cmd.env("NO_COLOR", "1");
	cmd.env_remove("RUST_LOG");
	cmd
}

pub const CONFIG: &str = r#"
roots = ["mod", "base"]

[types]
material = "material"
table = "table"

[[folders]]
folder = "materials"
extension = "mtr"
default_type = "material"
"#;

pub fn write_file(root: &Path, name: &str, content: &str) -> std::io::Result<()> {
	let path = root.join(name);
	if let Some(parent) = path.parent() {
		std::fs::create_dir_all(parent)?;
	}
	std::fs::write(path, content)
}

/// A project with two content roots and a mix of materials and tables.
pub fn sample_project(root: &Path) -> std::io::Result<()> {
	write_file(root, "decl.toml", CONFIG)?;
	write_file(
		root,
		"base/materials/walls.mtr",
		"// walls\nmaterial textures/base/wall\n{\n  diffusemap textures/base/wall\n}\n",
	)?;
	write_file(root, "base/materials/tables.mtr", "table sinTable { { 0, 1, 0, -1 } }\n")?;
	write_file(
		root,
		"mod/materials/walls.mtr",
		"material textures/base/wall\n{\n  diffusemap textures/mod/wall\n}\n",
	)?;
	write_file(root, "base/materials/floor.mtr", "textures/base/floor { qer_editorimage x }\n")
}
