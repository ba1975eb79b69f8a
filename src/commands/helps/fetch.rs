pub const HELP: &str = r#"Place every module of the project on disk.

Usage:
    hdlweave fetch

Each module is printed with its source kind, checked out revision, and
location once the whole tree is available.
"#;
