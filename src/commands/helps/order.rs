pub const HELP: &str = r#"Print the project's files in compile order.

Usage:
    hdlweave order [options]

Options:
    --complete      keep every file of every module regardless of the action
    --json          print the ordered files, edges, and warnings as json
"#;
