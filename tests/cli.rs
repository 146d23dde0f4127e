//  ██████╗  █████╗ ███████╗███████╗██╗███╗   ██╗ ██████╗
//  ██╔══██╗██╔══██╗██╔════╝██╔════╝██║████╗  ██║██╔════╝
//  ██████╔╝███████║███████╗███████╗██║██╔██╗ ██║██║  ███╗
//  ██╔═══╝ ██╔══██║╚════██║╚════██║██║██║╚██╗██║██║   ██║
//  ██║     ██║  ██║███████║███████║██║██║ ╚████║╚██████╔╝
//  ╚═╝     ╚═╝  ╚═╝╚══════╝╚══════╝╚═╝╚═╝  ╚═══╝ ╚═════╝

#[cfg(test)]
mod passing {
    use std::fs;
    use std::path::Path;
    use std::process::{Command, Output};

    use assert_cmd::prelude::*;
    use tempfile::TempDir;

    const INDEX: &str = r#"<html><head><title>Home</title></head><body><h1 style="margin: 0">Home</h1><script>start()</script></body></html>"#;

    fn detangle(cwd: &Path) -> Command {
        let mut cmd = Command::cargo_bin(env!("CARGO_PKG_NAME")).unwrap();
        cmd.current_dir(cwd)
            .env_remove("DETANGLE_ROOT")
            .env_remove("DETANGLE_CONFIG")
            .env_remove("DETANGLE_DRY_RUN")
            .env_remove("DETANGLE_CREATE_BACKUPS")
            .env_remove("DETANGLE_MAX_FILENAME_LENGTH")
            .env("NO_COLOR", "1");
        cmd
    }

    fn stdout(output: &Output) -> String {
        String::from_utf8_lossy(&output.stdout).into_owned()
    }

    fn site() -> TempDir {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("index.html"), INDEX).unwrap();
        dir
    }

    #[test]
    fn print_config() {
        let dir = TempDir::new().unwrap();
        let output = detangle(dir.path()).arg("--print-config").output().unwrap();

        assert!(output.status.success());
        let printed = stdout(&output);
        assert!(printed.contains("htmlSourcePatterns"));
        assert!(printed.contains("compiledCssSuffix"));
    }

    #[test]
    fn list_env() {
        let dir = TempDir::new().unwrap();
        let output = detangle(dir.path()).arg("--list-env").output().unwrap();

        assert!(output.status.success());
        assert!(stdout(&output).contains("DETANGLE_ROOT"));
    }

    #[test]
    fn dry_run_writes_nothing() {
        let dir = site();
        let output = detangle(dir.path())
            .args(["--root", ".", "--dry-run"])
            .output()
            .unwrap();

        assert!(output.status.success());
        assert!(stdout(&output).contains("(dry run)"));
        assert_eq!(fs::read_to_string(dir.path().join("index.html")).unwrap(), INDEX);
        assert!(!dir.path().join("styles").exists());
        assert!(!dir.path().join("index.js").exists());
    }

    #[test]
    fn batch_then_rerun() {
        let dir = site();

        let first = detangle(dir.path()).args(["--root", "."]).output().unwrap();
        assert!(first.status.success());
        assert!(stdout(&first).starts_with("1 documents, 1 changed"));

        let html = fs::read_to_string(dir.path().join("index.html")).unwrap();
        assert!(html.contains(r#"href="dist/css/index.min.css""#));
        assert!(html.contains(r#"<script src="index.js"></script>"#));
        assert_eq!(fs::read_to_string(dir.path().join("index.js")).unwrap(), "start()");
        assert!(dir.path().join("styles/index.css").exists());

        let second = detangle(dir.path()).args(["--root", "."]).output().unwrap();
        assert!(second.status.success());
        assert!(stdout(&second).contains("0 changed"));
        assert!(stdout(&second).contains(" 0 writes"));
        assert_eq!(fs::read_to_string(dir.path().join("index.html")).unwrap(), html);
    }

    #[test]
    fn single_document_under_root() {
        let dir = site();
        fs::create_dir_all(dir.path().join("blog")).unwrap();
        fs::write(dir.path().join("blog/post.html"), r#"<p style="color:red">x</p>"#).unwrap();

        let output = detangle(dir.path())
            .args(["--root", ".", "blog/post.html"])
            .output()
            .unwrap();

        assert!(output.status.success());
        assert!(stdout(&output).starts_with("1 documents"));
        assert!(dir.path().join("styles/blog_post.css").exists());
        // 未指定的文档保持原样
        assert_eq!(fs::read_to_string(dir.path().join("index.html")).unwrap(), INDEX);
    }

    #[test]
    fn build_copies_without_tools() {
        let dir = site();

        let output = detangle(dir.path())
            .args(["--root", ".", "--build"])
            .output()
            .unwrap();

        assert!(output.status.success());
        assert!(dir.path().join("dist/css/index.min.css").exists());
        assert_eq!(
            fs::read_to_string(dir.path().join("dist/js/index.js")).unwrap(),
            "start()"
        );
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
    use std::path::Path;
    use std::process::Command;

    use assert_cmd::prelude::*;
    use tempfile::TempDir;

    fn detangle(cwd: &Path) -> Command {
        let mut cmd = Command::cargo_bin(env!("CARGO_PKG_NAME")).unwrap();
        cmd.current_dir(cwd)
            .env_remove("DETANGLE_ROOT")
            .env_remove("DETANGLE_CONFIG")
            .env("NO_COLOR", "1");
        cmd
    }

    #[test]
    fn document_outside_root() {
        let root = TempDir::new().unwrap();
        let other = TempDir::new().unwrap();
        let stray = other.path().join("stray.html");
        fs::write(&stray, "<p>x</p>").unwrap();

        let output = detangle(root.path())
            .args(["--root", "."])
            .arg(&stray)
            .output()
            .unwrap();

        assert!(!output.status.success());
        assert!(String::from_utf8_lossy(&output.stderr).contains("detangle:"));
        assert_eq!(fs::read_to_string(&stray).unwrap(), "<p>x</p>");
    }

    #[test]
    fn missing_config_file() {
        let dir = TempDir::new().unwrap();

        let output = detangle(dir.path())
            .args(["--config", "nope.toml"])
            .output()
            .unwrap();

        assert!(!output.status.success());
    }

    #[test]
    fn missing_document() {
        let dir = TempDir::new().unwrap();

        let output = detangle(dir.path())
            .args(["--root", ".", "absent.html"])
            .output()
            .unwrap();

        assert!(!output.status.success());
    }
}
