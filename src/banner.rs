// src/banner.rs

/// Prints the application startup banner to the console.
pub fn print_banner() {
    let banner = r#"
                      _                          _
  __ _ _ __ __ _  __| | ___    __ _  ___ _ __ (_) ___
 / _` | '__/ _` |/ _` |/ _ \  / _` |/ _ \ '_ \| |/ _ \
| (_| | | | (_| | (_| |  __/ | (_| |  __/ | | | |  __/
 \__, |_|  \__,_|\__,_|\___|  \__, |\___|_| |_|_|\___|
 |___/                        |___/

    Exam Paper Grading Service
"#;
    println!("{}", banner);
}
