//! Project initialization command.

use anyhow::Result;

pub fn cmd_init(project_dir: &std::path::Path) -> Result<()> {
    use delphi::init::{init_project, is_initialized};

    let was_initialized = is_initialized(project_dir);

    let result = init_project(project_dir)?;

    if result.created {
        println!(
            "Initialized review project at {}",
            result.delphi_dir.display()
        );
        println!();
        println!("Created directory structure:");
        println!("  .delphi/");
        println!("  ├── delphi.toml   # Scoring dimensions, identity mode, store backend");
        println!("  ├── corpus.json   # Documents under review");
        println!("  ├── roster.json   # Expert names and access tokens");
        println!("  ├── submissions/  # Submission ledger");
        println!("  └── logs/         # Daily log files");
        println!();
        println!("Next steps:");
        println!("  1. Fill corpus.json with {{\"ID\", \"Title\", \"Evidence\", \"AI_Report\", \"Author_Conclusion\"}} rows");
        println!("  2. Fill roster.json with {{\"name\", \"token\"}} rows");
        println!("  3. Hand each expert their token and run `delphi review --token <TOKEN>`");
    } else if was_initialized {
        println!(
            "Review project already initialized at {}",
            result.delphi_dir.display()
        );
        println!("Directory structure verified.");
    }

    Ok(())
}
