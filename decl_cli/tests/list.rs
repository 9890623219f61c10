mod common;

use decl_core::AnyEmptyResult;
use serde_json::Value;
use similar_asserts::assert_eq;

#[test]
fn list_groups_declarations_by_type() -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;
	common::sample_project(tmp.path())?;

	common::decl_cmd()
		.arg("list")
		.arg("--path")
		.arg(tmp.path())
		.assert()
		.success()
		.stdout(predicates::str::contains("material:"))
		.stdout(predicates::str::contains("  textures/base/floor materials/floor.mtr"))
		.stdout(predicates::str::contains("table:\n  sinTable materials/tables.mtr"))
		.stdout(predicates::str::contains("3 declaration(s), 0 unrecognised block(s)"));

	Ok(())
}

#[test]
fn list_filters_by_type_as_json() -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;
	common::sample_project(tmp.path())?;

	let output = common::decl_cmd()
		.args(["list", "--type", "material", "--format", "json", "--path"])
		.arg(tmp.path())
		.output()?;
	assert!(output.status.success());

	let value: Value = serde_json::from_slice(&output.stdout)?;
	let names: Vec<_> = value["declarations"]
		.as_array()
		.map(|entries| {
			entries
				.iter()
				.filter_map(|entry| entry["name"].as_str())
				.collect()
		})
		.unwrap_or_default();
	assert_eq!(names, vec!["textures/base/floor", "textures/base/wall"]);
	assert_eq!(value["declarations"][1]["mod"], "mod");
	assert_eq!(value["unrecognised"], 0);

	Ok(())
}

#[test]
fn list_without_config_finds_nothing() -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;

	common::decl_cmd()
		.arg("list")
		.arg("--path")
		.arg(tmp.path())
		.assert()
		.success()
		.stdout(predicates::str::contains("No declarations found."));

	Ok(())
}

#[test]
fn list_reports_invalid_config() -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;
	common::write_file(tmp.path(), "decl.toml", "roots = [")?;

	common::decl_cmd()
		.arg("list")
		.arg("--path")
		.arg(tmp.path())
		.assert()
		.code(2)
		.stderr(predicates::str::contains("decl::config_parse"));

	Ok(())
}
