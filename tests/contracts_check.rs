mod common;

use common::{path_arg, StubReply, StubServer, TestEnv};
use jsonschema::JSONSchema;
use serde_json::{json, Value};
use std::fs;
use std::path::PathBuf;

fn load_schema(name: &str) -> Value {
    let root = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    let raw = fs::read_to_string(root.join("docs/contracts").join(name)).unwrap();
    serde_json::from_str(&raw).unwrap()
}

fn validate(schema_name: &str, data: &Value) {
    let schema = load_schema(schema_name);
    let validator = JSONSchema::compile(&schema).expect("compile schema");
    let msgs: Vec<String> = match validator.validate(data) {
        Ok(()) => return,
        Err(errors) => errors.map(|e| e.to_string()).collect(),
    };
    panic!("schema validation failed: {}", msgs.join(" | "));
}

fn findings() -> Value {
    json!([
        {"level": "WARNING", "type": "Hardcoded Secret", "message": "api key literal", "recommendation": "Load from env."},
        {"level": "CRITICAL", "type": "Command Injection", "message": "os.system(user)", "recommendation": "Use subprocess with args."},
        {"type": "Partial"}
    ])
}

#[test]
fn json_outputs_match_contracts() {
    let env = TestEnv::new();
    let src = env.write_source("tool.py", "import os\nos.system(cmd)\n");

    let admission = env.run_json(&["validate", path_arg(&src)]);
    validate("admission.schema.json", &admission["data"]);

    let server = StubServer::start(vec![StubReply::json(200, findings())]);
    let scan = env
        .cmd()
        .env("NUVAI_CLIPBOARD_CMD", "cat > /dev/null")
        .args([
            "--json",
            "scan",
            path_arg(&src),
            "--base-url",
            &server.base_url,
            "--export",
            path_arg(&env.work),
            "--copy",
            "1",
        ])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let scan: Value = serde_json::from_slice(&scan).unwrap();
    validate("scan.schema.json", &scan["data"]);
    validate("findings-view.schema.json", &scan["data"]["view"]);

    let exported = env.work.join("nuvai_scan_results.json");
    let exported_json: Value = serde_json::from_str(&fs::read_to_string(&exported).unwrap()).unwrap();
    validate("findings-export.schema.json", &exported_json);

    let view = env.run_json(&["findings", "show", path_arg(&exported), "--filter", "CRITICAL"]);
    validate("findings-view.schema.json", &view["data"]);

    let failed = env.run_json(&["findings", "show", "missing.json"]);
    validate("findings-view.schema.json", &failed["data"]);
}

#[test]
fn failures_match_error_contract() {
    let env = TestEnv::new();
    let rejected = env.write_source("a.rb", "puts 1\n");
    validate(
        "error.schema.json",
        &env.run_json_failure(&["validate", path_arg(&rejected)]),
    );
    validate("error.schema.json", &env.run_json_failure(&["scan"]));

    let broken = env.work.join("broken.json");
    fs::write(&broken, "[1, 2]").unwrap();
    let fault = env.run_json_failure(&["findings", "show", path_arg(&broken)]);
    validate("error.schema.json", &fault);

    let record = env.run_json(&["diagnostics", "show"]);
    validate("diagnostic-record.schema.json", &record["data"]);
    assert_eq!(record["data"]["id"], fault["error"]["trace_id"]);
}
