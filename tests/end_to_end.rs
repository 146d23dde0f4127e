//  ██████╗  █████╗ ███████╗███████╗██╗███╗   ██╗ ██████╗
//  ██╔══██╗██╔══██╗██╔════╝██╔════╝██║████╗  ██║██╔════╝
//  ██████╔╝███████║███████╗███████╗██║██╔██╗ ██║██║  ███╗
//  ██╔═══╝ ██╔══██║╚════██║╚════██║██║██║╚██╗██║██║   ██║
//  ██║     ██║  ██║███████║███████║██║██║ ╚████║╚██████╔╝
//  ╚═╝     ╚═╝  ╚═╝╚══════╝╚══════╝╚═╝╚═╝  ╚═══╝ ╚═════╝

#[cfg(test)]
mod passing {
    use std::fs;
    use std::path::{Path, PathBuf};

    use tempfile::TempDir;

    use detangle::config::RefactorConfig;
    use detangle::storage::{FsStore, OutputWriter};
    use detangle::utils::paths::lexical_normalize;
    use detangle::{BatchReport, BatchRunner};

    const ABOUT: &str = r#"<!DOCTYPE html><html><head><title>About</title><style>.a{color:red}</style></head><body><div style="color:red">hi</div><script>console.log(1)</script></body></html>"#;

    fn site() -> (TempDir, PathBuf) {
        let dir = TempDir::new().unwrap();
        let root = fs::canonicalize(dir.path()).unwrap();
        fs::create_dir_all(root.join("pages")).unwrap();
        fs::write(root.join("pages/about.html"), ABOUT).unwrap();
        (dir, root)
    }

    fn stylesheet_href(html: &str) -> &str {
        let marker = r#"rel="stylesheet" href=""#;
        let start = html.find(marker).unwrap() + marker.len();
        let end = start + html[start..].find('"').unwrap();
        &html[start..end]
    }

    /// 以文档所在目录为基准解析 href
    fn resolve_href(html_path: &Path, href: &str) -> PathBuf {
        lexical_normalize(&html_path.parent().unwrap().join(href))
    }

    async fn run(config: &RefactorConfig, root: &Path) -> BatchReport {
        let layout = config.resolve_against(root);
        let writer = OutputWriter::new(FsStore, layout.write_options(config));
        BatchRunner::new(layout, writer, 4)
            .run(&[root.join("pages/about.html")])
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn about_page_on_disk() {
        let (_dir, root) = site();

        let report = run(&RefactorConfig::default(), &root).await;
        assert_eq!(report.changed, 1);

        let css = fs::read_to_string(root.join("styles/pages_about.css")).unwrap();
        assert!(css.contains("/* --- pages/about.html --- */"));
        assert!(css.contains(".a{color:red}"));
        assert!(css.contains("color:red;"));

        let html = fs::read_to_string(root.join("pages/about.html")).unwrap();
        assert!(html.contains(r#"<link rel="stylesheet" href="../dist/css/pages_about.min.css">"#));
        assert_eq!(
            resolve_href(&root.join("pages/about.html"), stylesheet_href(&html)),
            root.join("dist/css/pages_about.min.css")
        );
        assert!(html.contains(r#"<script src="pages_about.js"></script>"#));
        assert!(!html.contains("<style>"));
        assert!(!html.contains("style="));

        assert_eq!(
            fs::read_to_string(root.join("pages/pages_about.js")).unwrap(),
            "console.log(1)"
        );
    }

    #[tokio::test]
    async fn second_run_leaves_disk_alone() {
        let (_dir, root) = site();
        let config = RefactorConfig::default();

        run(&config, &root).await;
        let html = fs::read(root.join("pages/about.html")).unwrap();
        let css = fs::read(root.join("styles/pages_about.css")).unwrap();

        let report = run(&config, &root).await;

        assert_eq!(report.changed, 0);
        assert_eq!(report.stats.total_writes(), 0);
        assert_eq!(fs::read(root.join("pages/about.html")).unwrap(), html);
        assert_eq!(fs::read(root.join("styles/pages_about.css")).unwrap(), css);
    }

    #[tokio::test]
    async fn backups_keep_the_original() {
        let (_dir, root) = site();
        let config = RefactorConfig {
            create_backups: true,
            ..RefactorConfig::default()
        };

        let report = run(&config, &root).await;

        assert_eq!(report.stats.backups, 1);
        assert_eq!(
            fs::read_to_string(root.join("pages/about.html.bak")).unwrap(),
            ABOUT
        );
    }

    #[tokio::test]
    async fn mirror_receives_outputs_and_source_is_kept() {
        let (_dir, root) = site();
        let config = RefactorConfig {
            mirror_output_dir: Some(PathBuf::from("out")),
            ..RefactorConfig::default()
        };

        let report = run(&config, &root).await;

        assert_eq!(report.changed, 1);
        assert_eq!(fs::read_to_string(root.join("pages/about.html")).unwrap(), ABOUT);
        assert_eq!(
            fs::read(root.join("out/styles/pages_about.css")).unwrap(),
            fs::read(root.join("styles/pages_about.css")).unwrap()
        );
        assert!(root.join("out/pages/pages_about.js").exists());

        let mirrored = root.join("out/pages/about.html");
        let html = fs::read_to_string(&mirrored).unwrap();
        assert_eq!(
            resolve_href(&mirrored, stylesheet_href(&html)),
            root.join("dist/css/pages_about.min.css")
        );

        let again = run(&config, &root).await;
        assert_eq!(again.stats.total_writes(), 0);
    }

    #[tokio::test]
    async fn dry_run_touches_nothing() {
        let (_dir, root) = site();
        let config = RefactorConfig {
            dry_run: true,
            create_backups: true,
            ..RefactorConfig::default()
        };

        let report = run(&config, &root).await;

        assert!(report.dry_run);
        assert_eq!(report.changed, 1);
        assert_eq!(fs::read_to_string(root.join("pages/about.html")).unwrap(), ABOUT);
        assert!(!root.join("styles").exists());
        assert!(!root.join("pages/pages_about.js").exists());
        assert!(!root.join("pages/about.html.bak").exists());
    }
}

//  ███████╗ █████╗ ██╗██╗     ██╗███╗   ██╗ ██████╗
//  ██╔════╝██╔══██╗██║██║     ██║████╗  ██║██╔════╝
//  █████╗  ███████║██║██║     ██║██╔██╗ ██║██║  ███╗
//  ██╔══╝  ██╔══██║██║██║     ██║██║╚██╗██║██║   ██║
//  ██║     ██║  ██║██║███████╗██║██║ ╚████║╚██████╔╝
//  ╚═╝     ╚═╝  ╚═╝╚═╝╚══════╝╚═╝╚═╝  ╚═══╝ ╚═════╝

#[cfg(test)]
mod failing {
    use std::fs;

    use tempfile::TempDir;

    use detangle::config::RefactorConfig;
    use detangle::DetangleError;

    #[test]
    fn missing_root_cannot_resolve() {
        let dir = TempDir::new().unwrap();
        let config = RefactorConfig {
            root_dir: dir.path().join("nowhere"),
            ..RefactorConfig::default()
        };

        assert!(matches!(config.resolve(), Err(DetangleError::Io { .. })));
    }

    #[test]
    fn invalid_config_file_is_reported() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("detangle.toml");
        fs::write(&path, "maxFilenameLength = \"long\"").unwrap();

        let result = detangle::ConfigManager::load_from_file(&path);

        assert!(matches!(result, Err(DetangleError::Config(_))));
    }
}
