//! Builder command line construction.

use std::fmt;

use crate::config::{BuildConfig, IMAGE_ARCH, IMAGE_FORMAT};

/// A fully assembled builder invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildCommand {
    /// Executable name or path
    pub program: String,
    /// Arguments, elements last
    pub args: Vec<String>,
    /// Variables exported to the child on top of the inherited environment
    pub env: Vec<(&'static str, String)>,
}

impl BuildCommand {
    /// Builds the argument vector for `config`.
    ///
    /// Layout: fixed flags, `-x` in debug mode, passthrough arguments, then
    /// element names with user extras at the end.
    pub fn new(config: &BuildConfig) -> Self {
        let mut args = vec![
            "-a".to_string(),
            IMAGE_ARCH.to_string(),
            "-t".to_string(),
            IMAGE_FORMAT.to_string(),
            "-o".to_string(),
            config.output.display().to_string(),
        ];
        args.extend(config.qemu_img_options.iter().cloned());
        if config.debug {
            args.push("-x".to_string());
        }
        args.extend(config.passthrough.iter().cloned());
        args.extend(config.elements());

        Self {
            program: config.image_builder.clone(),
            args,
            env: config.exported_env(),
        }
    }
}

impl fmt::Display for BuildCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", quote(&self.program))?;
        for arg in &self.args {
            write!(f, " {}", quote(arg))?;
        }
        Ok(())
    }
}

/// Single-quotes an argument when a shell would otherwise split or expand it.
fn quote(arg: &str) -> String {
    let plain = !arg.is_empty()
        && arg
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "-_./=:,+@%".contains(c));
    if plain {
        arg.to_string()
    } else {
        format!("'{}'", arg.replace('\'', r"'\''"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::Args;
    use std::collections::HashMap;

    async fn config(args: Args) -> BuildConfig {
        let env: HashMap<String, String> = [
            ("HOME", "/home/dev"),
            ("CONTROLLER_IP", "10.0.0.1"),
            ("LOG_DIR", "/var/log/dib"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
        BuildConfig::resolve(&args, &env).await.unwrap()
    }

    #[tokio::test]
    async fn builds_expected_argument_vector() {
        let args = Args {
            distro: Some("ubuntu".into()),
            distro_release: Some("xenial".into()),
            datastore: Some("mariadb".into()),
            output: Some("/images/guest".into()),
            ..Args::default()
        };
        let config = config(args).await;
        let command = BuildCommand::new(&config);

        assert_eq!(command.program, "disk-image-create");
        assert_eq!(
            command.args,
            vec![
                "-a",
                "amd64",
                "-t",
                "qcow2",
                "-o",
                "/images/guest",
                "--qemu-img-options",
                "compat=1.1",
                "ubuntu",
                "vm",
                "cloud-init-datasources",
                "ubuntu-xenial-guest",
                "ubuntu-xenial-mariadb",
            ]
        );
        assert_eq!(
            config.log_path.display().to_string(),
            "/var/log/dib/dib-ubuntu-xenial-mariadb.log"
        );
    }

    #[tokio::test]
    async fn debug_and_passthrough_precede_elements_and_extras_come_last() {
        let args = Args {
            debug: true,
            extra_elements: Some("pip-cache".into()),
            passthrough: vec!["--min-tmpfs".into(), "4".into()],
            ..Args::default()
        };
        let command = BuildCommand::new(&config(args).await);

        let x = command.args.iter().position(|a| a == "-x").unwrap();
        let tmpfs = command.args.iter().position(|a| a == "--min-tmpfs").unwrap();
        let distro = command.args.iter().position(|a| a == "ubuntu").unwrap();
        assert!(x < tmpfs && tmpfs < distro);
        assert_eq!(command.args.last().map(String::as_str), Some("pip-cache"));
    }

    #[tokio::test]
    async fn exports_elements_path_to_child() {
        let command = BuildCommand::new(&config(Args::default()).await);
        let elements_path = command
            .env
            .iter()
            .find(|(name, _)| *name == "ELEMENTS_PATH")
            .map(|(_, value)| value.as_str());
        assert!(elements_path.unwrap().contains("/home/dev/workspace/diskimage-builder/elements"));
    }

    #[test]
    fn display_quotes_only_when_needed() {
        let command = BuildCommand {
            program: "disk-image-create".into(),
            args: vec!["-o".into(), "/tmp/my image".into(), "it's".into(), "".into()],
            env: Vec::new(),
        };
        assert_eq!(
            command.to_string(),
            r#"disk-image-create -o '/tmp/my image' 'it'\''s' ''"#
        );
    }
}
