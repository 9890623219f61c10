mod common;

use decl_core::AnyEmptyResult;

#[test]
fn show_prints_the_winning_block() -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;
	common::sample_project(tmp.path())?;

	common::decl_cmd()
		.args(["show", "material", "TEXTURES/BASE/WALL", "--path"])
		.arg(tmp.path())
		.assert()
		.success()
		.stdout("material textures/base/wall\n{\n  diffusemap textures/mod/wall\n}\n")
		.stderr(predicates::str::contains("// materials/walls.mtr (mod)"));

	Ok(())
}

#[test]
fn show_fails_for_missing_declaration() -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;
	common::sample_project(tmp.path())?;

	common::decl_cmd()
		.args(["show", "skin", "nothing", "--path"])
		.arg(tmp.path())
		.assert()
		.code(2)
		.stderr(predicates::str::contains("no skin declaration named `nothing`"));

	Ok(())
}
