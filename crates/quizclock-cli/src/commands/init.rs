//! The `quizclock init` command.

use anyhow::Result;

pub fn execute() -> Result<()> {
    // Create quizclock.toml
    if std::path::Path::new("quizclock.toml").exists() {
        println!("quizclock.toml already exists, skipping.");
    } else {
        std::fs::write("quizclock.toml", SAMPLE_CONFIG)?;
        println!("Created quizclock.toml");
    }

    // Create sample quiz
    std::fs::create_dir_all("quizzes")?;
    let sample_path = std::path::Path::new("quizzes/sample.toml");
    if sample_path.exists() {
        println!("quizzes/sample.toml already exists, skipping.");
    } else {
        std::fs::write(sample_path, SAMPLE_QUIZ)?;
        println!("Created quizzes/sample.toml");
    }

    println!("\nNext steps:");
    println!("  1. Run: quizclock validate --quiz quizzes/sample.toml");
    println!("  2. Run: quizclock take --quiz quizzes/sample.toml");

    Ok(())
}

const SAMPLE_CONFIG: &str = r#"# quizclock configuration

autosave_interval_secs = 12
tick_interval_ms = 1000
# restart | submit_immediately
expired_deadline_policy = "restart"
allow_back_navigation = true
results_dir = "./quizclock-results"

[store]
type = "file"
dir = "./.quizclock/attempts"
"#;

const SAMPLE_QUIZ: &str = include_str!("../../../../quizzes/sample.toml");
