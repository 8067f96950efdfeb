use nextnode::config::NextNodeConfig;
use nextnode::tooling::cli::{BlockCommands, CliContext, Commands, PageCommands};
use nextnode::block::BlockType;
use nextnode::ApiError;
use tempfile::TempDir;

fn created_id(output: &str) -> String {
    output
        .lines()
        .find_map(|line| line.trim().strip_prefix("id: "))
        .map(str::to_string)
        .unwrap()
}

#[test]
fn page_lifecycle_through_cli() {
    let mut cli = CliContext::in_memory(NextNodeConfig::default()).unwrap();

    let out = cli
        .execute(&Commands::Page {
            command: PageCommands::Create { title: "Projects".to_string(), parent: None },
        })
        .unwrap();
    let parent = created_id(&out);
    let out = cli
        .execute(&Commands::Page {
            command: PageCommands::Create { title: "Rust".to_string(), parent: Some(parent.clone()) },
        })
        .unwrap();
    let child = created_id(&out);

    let tree = cli.execute(&Commands::Tree).unwrap();
    assert!(tree.contains("+ Projects"));
    assert!(tree.contains("  - Rust"));

    cli.execute(&Commands::Page {
        command: PageCommands::Move { id: child.clone(), parent: None, index: 0 },
    })
    .unwrap();
    let tree = cli.execute(&Commands::Tree).unwrap();
    assert!(tree.lines().any(|line| line.starts_with("- Rust")));
    assert!(tree.lines().any(|line| line.starts_with("- Projects")));

    cli.execute(&Commands::Page { command: PageCommands::Delete { id: parent.clone() } })
        .unwrap();
    let err = cli
        .execute(&Commands::Page { command: PageCommands::Delete { id: parent } })
        .unwrap_err();
    assert!(matches!(err, ApiError::PageNotFound(_)));
}

#[test]
fn block_commands_edit_document() {
    let mut cli = CliContext::in_memory(NextNodeConfig::default()).unwrap();
    let out = cli
        .execute(&Commands::Page {
            command: PageCommands::Create { title: "Notes".to_string(), parent: None },
        })
        .unwrap();
    let page = created_id(&out);

    cli.execute(&Commands::Block {
        command: BlockCommands::Add {
            page: page.clone(),
            block_type: BlockType::Code,
            parent: None,
            after: None,
            text: Some("println!(\"hi\")".to_string()),
        },
    })
    .unwrap();

    let outline = cli.execute(&Commands::Open { route: format!("/page/{}", page) }).unwrap();
    assert!(outline.contains("[javascript] println!(\"hi\")"));

    let err = cli
        .execute(&Commands::Block {
            command: BlockCommands::Add {
                page: "missing".to_string(),
                block_type: BlockType::Paragraph,
                parent: None,
                after: None,
                text: None,
            },
        })
        .unwrap_err();
    assert!(matches!(err, ApiError::PageNotFound(_)));
}

#[test]
fn export_then_import_through_cli() {
    let temp = TempDir::new().unwrap();
    let file = temp.path().join("export.json");

    let mut source = CliContext::in_memory(NextNodeConfig::default()).unwrap();
    source
        .execute(&Commands::Page {
            command: PageCommands::Create { title: "Kept".to_string(), parent: None },
        })
        .unwrap();
    source.execute(&Commands::Export { output: Some(file.clone()) }).unwrap();

    let mut target = CliContext::in_memory(NextNodeConfig::default()).unwrap();
    let out = target.execute(&Commands::Import { file }).unwrap();
    assert!(out.starts_with("Imported 1 pages and 1 blocks"));
    assert!(target.execute(&Commands::Tree).unwrap().contains("Kept"));
}

#[test]
fn on_disk_workspace_uses_configured_store_path() {
    let temp = TempDir::new().unwrap();
    let mut config = NextNodeConfig::default();
    config.storage.store_path = "notes-db".into();

    let mut cli = CliContext::with_config(temp.path().to_path_buf(), config).unwrap();
    cli.execute(&Commands::Page {
        command: PageCommands::Create { title: "Disk".to_string(), parent: None },
    })
    .unwrap();
    assert!(temp.path().join("notes-db").exists());

    let rendered = cli.execute(&Commands::Config).unwrap();
    assert!(rendered.contains("store_path = \"notes-db\""));
}
