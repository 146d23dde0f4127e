//  ██████╗  █████╗ ███████╗███████╗██╗███╗   ██╗ ██████╗
//  ██╔══██╗██╔══██╗██╔════╝██╔════╝██║████╗  ██║██╔════╝
//  ██████╔╝███████║███████╗███████╗██║██╔██╗ ██║██║  ███╗
//  ██╔═══╝ ██╔══██║╚════██║╚════██║██║██║╚██╗██║██║   ██║
//  ██║     ██║  ██║███████║███████║██║██║ ╚████║╚██████╔╝
//  ╚═╝     ╚═╝  ╚═╝╚══════╝╚══════╝╚═╝╚═╝  ╚═══╝ ╚═════╝

#[cfg(test)]
mod passing {
    use std::path::{Path, PathBuf};

    use detangle::config::{OutputStrategy, RefactorConfig};
    use detangle::storage::{MemoryStore, OutputWriter};
    use detangle::BatchRunner;

    fn runner(config: &RefactorConfig, store: MemoryStore, max_concurrent: usize) -> BatchRunner<MemoryStore> {
        let layout = config.resolve_against(Path::new("/site"));
        let writer = OutputWriter::new(store, layout.write_options(config));
        BatchRunner::new(layout, writer, max_concurrent)
    }

    fn paths(values: &[&str]) -> Vec<PathBuf> {
        values.iter().map(PathBuf::from).collect()
    }

    #[tokio::test]
    async fn shared_base_name_appends_css_and_renames_script() {
        let config = RefactorConfig {
            html_prefixes_to_omit_from_css_name: vec!["a".to_string(), "b".to_string()],
            js_output_dir_strategy: OutputStrategy::Centralized,
            ..RefactorConfig::default()
        };
        let store = MemoryStore::new()
            .with_file("/site/a/index.html", r#"<p style="color:red">a</p><script>a()</script>"#)
            .with_file("/site/b/index.html", r#"<p style="color:blue">b</p><script>b()</script>"#);
        let runner = runner(&config, store, 1);

        let report = runner
            .run(&paths(&["/site/a/index.html", "/site/b/index.html"]))
            .await
            .unwrap();

        assert_eq!(report.documents, 2);
        assert_eq!(report.css_created, 1);
        assert_eq!(report.css_appended, 1);
        assert_eq!(report.css_sources.len(), 1);

        let store = runner.writer().store();
        let css = store.get_string(Path::new("/site/styles/index.css")).unwrap();
        assert!(css.contains("/* --- a/index.html --- */"));
        assert!(css.contains("/* --- b/index.html --- */"));
        assert!(css.contains("color:red"));
        assert!(css.contains("color:blue"));

        // 两个文档争用 js/index.js，后到者换成带时间戳的名称
        assert_eq!(report.stats.collisions, 1);
        let scripts: Vec<PathBuf> = store
            .paths()
            .into_iter()
            .filter(|path| path.starts_with("/site/js"))
            .collect();
        assert_eq!(scripts.len(), 2);
        assert!(scripts.contains(&PathBuf::from("/site/js/index.js")));
        let renamed = scripts
            .iter()
            .find(|path| path.as_path() != Path::new("/site/js/index.js"))
            .unwrap();
        let renamed_name = renamed.file_name().unwrap().to_string_lossy().into_owned();
        assert!(renamed_name.starts_with("index_"));
        assert!(renamed_name.ends_with(".js"));

        let contents: Vec<String> = scripts
            .iter()
            .map(|path| store.get_string(path).unwrap())
            .collect();
        assert!(contents.contains(&"a()".to_string()));
        assert!(contents.contains(&"b()".to_string()));
    }

    #[tokio::test]
    async fn rerun_is_idempotent() {
        let config = RefactorConfig::default();
        let store = MemoryStore::new()
            .with_file(
                "/site/index.html",
                r#"<html><head><style>h1{margin:0}</style></head><body><h1 style="color:red">x</h1><script>go()</script></body></html>"#,
            )
            .with_file("/site/pages/about.html", r#"<p style="color:red">about</p>"#);
        let runner = runner(&config, store, 4);
        let documents = paths(&["/site/index.html", "/site/pages/about.html"]);

        let first = runner.run(&documents).await.unwrap();
        assert_eq!(first.changed, 2);
        let snapshot: Vec<(PathBuf, Option<Vec<u8>>)> = runner
            .writer()
            .store()
            .paths()
            .into_iter()
            .map(|path| {
                let contents = runner.writer().store().get(&path);
                (path, contents)
            })
            .collect();

        let second = runner.run(&documents).await.unwrap();
        assert_eq!(second.changed, 0);
        assert_eq!(second.scripts_extracted, 0);
        assert_eq!(second.stats.total_writes(), first.stats.total_writes());

        for (path, contents) in snapshot {
            assert_eq!(runner.writer().store().get(&path), contents, "{}", path.display());
        }
    }

    #[tokio::test]
    async fn identical_styles_from_two_documents_share_one_rule() {
        let config = RefactorConfig::default();
        let store = MemoryStore::new()
            .with_file("/site/one.html", r#"<p style="color: red">1</p><p style="COLOR:red">2</p>"#);
        let runner = runner(&config, store, 1);

        runner.run(&paths(&["/site/one.html"])).await.unwrap();

        let store = runner.writer().store();
        let css = store.get_string(Path::new("/site/styles/one.css")).unwrap();
        assert_eq!(css.matches("color:red").count(), 1);

        let html = store.get_string(Path::new("/site/one.html")).unwrap();
        assert!(!html.contains("style="));
        assert_eq!(html.matches("class=\"st-").count(), 2);
    }

    #[tokio::test]
    async fn dry_run_reports_without_writing() {
        let config = RefactorConfig {
            dry_run: true,
            ..RefactorConfig::default()
        };
        let original = r#"<p style="color:red">a</p><script>a()</script>"#;
        let store = MemoryStore::new().with_file("/site/a.html", original);
        let runner = runner(&config, store, 2);

        let report = runner.run(&paths(&["/site/a.html"])).await.unwrap();

        assert!(report.dry_run);
        assert_eq!(report.changed, 1);
        assert_eq!(report.stats.html_written, 1);
        assert_eq!(report.stats.css_written, 1);
        assert_eq!(report.stats.js_written, 1);

        let store = runner.writer().store();
        assert_eq!(store.writes(), 0);
        assert_eq!(store.get_string(Path::new("/site/a.html")).unwrap(), original);
        assert!(store.get(Path::new("/site/styles/a.css")).is_none());
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
    use std::path::{Path, PathBuf};

    use detangle::config::RefactorConfig;
    use detangle::storage::{MemoryStore, OutputWriter};
    use detangle::{discover_documents, BatchRunner, DetangleError};

    #[tokio::test]
    async fn missing_document_aborts_batch() {
        let config = RefactorConfig::default();
        let layout = config.resolve_against(Path::new("/site"));
        let store = MemoryStore::new().with_file("/site/a.html", "<p>a</p>");
        let writer = OutputWriter::new(store, layout.write_options(&config));
        let runner = BatchRunner::new(layout, writer, 2);

        let result = runner
            .run(&[PathBuf::from("/site/a.html"), PathBuf::from("/site/gone.html")])
            .await;

        assert!(matches!(result, Err(DetangleError::SourceMissing(path)) if path == Path::new("/site/gone.html")));
    }

    #[test]
    fn bad_glob_is_rejected() {
        let config = RefactorConfig::default();
        let layout = config.resolve_against(Path::new("/site"));

        let result = discover_documents(&layout, &["**/[.html".to_string()], &[]);

        assert!(matches!(result, Err(DetangleError::Pattern { .. })));
    }
}
