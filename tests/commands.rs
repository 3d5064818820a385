//! Command handlers end to end, against a local proxy

mod helper;

use std::path::PathBuf;

use tokio_util::sync::CancellationToken;

use gx::commands::{self, CommandContext};
use gx::config::OutputOptions;
use gx::report::OutdatedOptions;
use helper::FakeProxy;

fn context(dir: &tempfile::TempDir, go_mod: &str) -> CommandContext {
    let modfile: PathBuf = dir.path().join("go.mod");
    std::fs::write(&modfile, go_mod).unwrap();
    CommandContext {
        modfile,
        output: OutputOptions::default(),
        max_depth: 10,
        cancel: CancellationToken::new(),
    }
}

#[tokio::test]
async fn outdated_reports_updates_from_proxy() {
    let proxy = FakeProxy::start()
        .await
        .with_latest("golang.org/x/text", "v0.21.0")
        .await
        .with_latest("github.com/BurntSushi/toml", "v1.3.2")
        .await
        .with_latest("gopkg.in/yaml.v3", "v3.0.1")
        .await;
    let dir = tempfile::tempdir().unwrap();
    let ctx = context(
        &dir,
        "module example.com/app

require (
	golang.org/x/text v0.14.0
	github.com/BurntSushi/toml v1.3.2
)

require gopkg.in/yaml.v3 v3.0.0 // indirect
",
    );

    let out = commands::outdated(&ctx, &proxy.client(), OutdatedOptions::default())
        .await
        .unwrap();

    assert!(out.contains("golang.org/x/text"));
    assert!(out.contains("v0.21.0"));
    assert!(!out.contains("BurntSushi"));
    assert!(out.contains("Indirect dependencies"));
    assert!(out.contains("2 package(s) can be updated (1 minor, 1 patch)"));
}

#[tokio::test]
async fn outdated_skips_modules_the_proxy_cannot_resolve() {
    let proxy = FakeProxy::start()
        .await
        .with_latest("golang.org/x/text", "v0.14.0")
        .await;
    let dir = tempfile::tempdir().unwrap();
    let ctx = context(
        &dir,
        "module example.com/app\n\nrequire (\n\tgolang.org/x/text v0.14.0\n\texample.com/private v1.0.0\n)\n",
    );

    let out = commands::outdated(&ctx, &proxy.client(), OutdatedOptions::default())
        .await
        .unwrap();

    assert_eq!(out, "All packages are up to date!\n");
}

#[tokio::test]
async fn why_with_remote_graph_traces_transitive_module() {
    let proxy = FakeProxy::start()
        .await
        .with_mod(
            "github.com/spf13/cobra",
            "v1.8.0",
            "module github.com/spf13/cobra\n\nrequire github.com/spf13/pflag v1.0.5\n",
        )
        .await;
    let dir = tempfile::tempdir().unwrap();
    let ctx = context(
        &dir,
        "module example.com/app\n\nrequire github.com/spf13/cobra v1.8.0\n",
    );
    let client = proxy.client();

    let out = commands::why(&ctx, Some(&client), "github.com/spf13/pflag")
        .await
        .unwrap();

    assert_eq!(
        out,
        "1 path(s) to github.com/spf13/pflag:\nexample.com/app → github.com/spf13/cobra → github.com/spf13/pflag\n"
    );
}
