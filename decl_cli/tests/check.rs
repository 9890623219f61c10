mod common;

use decl_core::AnyEmptyResult;
use rstest::rstest;

#[test]
fn check_passes_for_clean_project() -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;
	common::sample_project(tmp.path())?;

	common::decl_cmd()
		.arg("check")
		.arg("--path")
		.arg(tmp.path())
		.assert()
		.success()
		.stdout(predicates::str::contains("3 file(s) checked, all declarations recognised."));

	Ok(())
}

#[test]
fn check_reports_unrecognised_blocks() -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;
	common::sample_project(tmp.path())?;
	common::write_file(tmp.path(), "base/materials/sounds.mtr", "sound_shader door_open { }\n")?;

	common::decl_cmd()
		.arg("check")
		.arg("--path")
		.arg(tmp.path())
		.assert()
		.code(1)
		.stderr(predicates::str::contains(
			"block `door_open` has unregistered type `sound_shader` in materials/sounds.mtr",
		))
		.stdout(predicates::str::contains("1 unrecognised block(s)"));

	Ok(())
}

#[test]
fn check_flags_bytes_that_do_not_round_trip() -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;
	common::write_file(tmp.path(), "decl.toml", common::CONFIG)?;
	std::fs::create_dir_all(tmp.path().join("base/materials"))?;
	std::fs::write(tmp.path().join("base/materials/bad.mtr"), b"material bad { \xff }\n")?;

	common::decl_cmd()
		.arg("check")
		.arg("--path")
		.arg(tmp.path())
		.assert()
		.code(1)
		.stderr(predicates::str::contains("does not round-trip"));

	Ok(())
}

#[rstest]
#[case::extra_header("a b c { }\n", "invalid number of decl block headers")]
#[case::unterminated("material open {\n", "unterminated braced block")]
fn check_prints_parse_warnings(#[case] content: &str, #[case] expected: &str) -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;
	common::write_file(tmp.path(), "decl.toml", common::CONFIG)?;
	common::write_file(tmp.path(), "base/materials/warn.mtr", content)?;

	common::decl_cmd()
		.arg("check")
		.arg("--path")
		.arg(tmp.path())
		.assert()
		.stderr(predicates::str::contains(format!("warning: materials/warn.mtr:1: {expected}")));

	Ok(())
}

#[test]
fn missing_subcommand_fails() {
	common::decl_cmd()
		.assert()
		.code(1)
		.stderr(predicates::str::contains("No subcommand specified"));
}
