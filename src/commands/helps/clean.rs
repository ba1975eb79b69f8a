pub const HELP: &str = r#"Remove the checked out sources of remote modules.

Usage:
    hdlweave clean

Local modules are never removed.
"#;
