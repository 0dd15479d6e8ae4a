//! Build configuration and default resolution.
//!
//! Every field is taken from its command-line flag, then from the environment
//! variable of the same upper-case name, then from a built-in default. Fields
//! derived from other fields are computed after all of their inputs.

pub mod env;
pub mod network;

use anyhow::Context;
use path_absolutize::Absolutize;
use std::path::{Path, PathBuf};

use crate::cli::Args;
use crate::error::Result;

pub use env::{EnvSource, ProcessEnv};

/// Default OS distribution
pub const DEFAULT_DISTRO: &str = "ubuntu";

/// Default OS release codename
pub const DEFAULT_DISTRO_RELEASE: &str = "xenial";

/// Default datastore (service type)
pub const DEFAULT_DATASTORE: &str = "mariadb";

/// Default user on the controller and inside the guest
pub const DEFAULT_USERNAME: &str = "ubuntu";

/// Default log directory inside the guest
pub const DEFAULT_GUEST_LOGDIR: &str = "/var/log/trove/";

/// Image builder executable
pub const DEFAULT_IMAGE_BUILDER: &str = "disk-image-create";

/// Fixed qemu-img options passed to the builder
pub const DEFAULT_QEMU_IMG_OPTIONS: &[&str] = &["--qemu-img-options", "compat=1.1"];

/// Output image format
pub const IMAGE_FORMAT: &str = "qcow2";

/// Target architecture
pub const IMAGE_ARCH: &str = "amd64";

/// cloud-init datasource baked into every guest
pub const CLOUD_INIT_DATASOURCES: &str = "ConfigDrive";

/// Address used when no outbound route can be found
const FALLBACK_CONTROLLER_IP: &str = "127.0.0.1";

/// Fully resolved configuration for one image build.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildConfig {
    /// Controller account the guest connects back to
    pub host_username: String,
    /// Account used for scp from the guest to the controller
    pub host_scp_username: String,
    /// Login created inside the guest
    pub guest_username: String,
    /// Controller address baked into the guest
    pub controller_ip: String,
    /// Base directory for derived paths
    pub workspace: PathBuf,
    /// Trove source checkout
    pub path_trove: PathBuf,
    /// `path_trove` with `/` escaped for sed substitution
    pub escaped_path_trove: String,
    /// diskimage-builder checkout
    pub path_diskimage_builder: PathBuf,
    /// tripleo-image-elements checkout
    pub path_tripleo_elements: PathBuf,
    /// SSH keys copied into the guest
    pub ssh_dir: PathBuf,
    /// Log directory inside the guest
    pub guest_logdir: String,
    /// `guest_logdir` with `/` escaped for sed substitution
    pub escaped_guest_logdir: String,
    /// Colon-delimited element search path
    pub elements_path: String,
    /// OS distribution
    pub distro: String,
    /// OS release codename
    pub distro_release: String,
    /// Datastore (service type)
    pub datastore: String,
    /// User elements appended after the built-in ones
    pub extra_elements: Vec<String>,
    /// Image path handed to the builder
    pub output: PathBuf,
    /// Directory holding build transcripts
    pub log_dir: PathBuf,
    /// Transcript of this build
    pub log_path: PathBuf,
    /// qemu-img options, already split into arguments
    pub qemu_img_options: Vec<String>,
    /// Builder executable name or path
    pub image_builder: String,
    /// Verbose tracing, also passed to the builder as `-x`
    pub debug: bool,
    /// Arguments given after `--`
    pub passthrough: Vec<String>,
}

impl BuildConfig {
    /// Resolves the configuration from parsed flags and the environment.
    ///
    /// Controller address detection only runs when neither `--controller-ip`
    /// nor `CONTROLLER_IP` is set.
    pub async fn resolve(args: &Args, env: &impl EnvSource) -> Result<Self> {
        let pick = |flag: &Option<String>, key: &str| flag.clone().or_else(|| env.var(key));

        let home = match env.home_dir() {
            Some(home) => home,
            None => absolute(Path::new("."))?,
        };

        let host_username = env
            .var("HOST_USERNAME")
            .or_else(|| env.login_name())
            .unwrap_or_else(|| DEFAULT_USERNAME.to_string());
        let host_scp_username = env
            .var("HOST_SCP_USERNAME")
            .unwrap_or_else(|| host_username.clone());
        let guest_username = env
            .var("GUEST_USERNAME")
            .unwrap_or_else(|| DEFAULT_USERNAME.to_string());

        let controller_ip = match pick(&args.controller_ip, "CONTROLLER_IP") {
            Some(ip) => ip,
            None => match network::detect_controller_ip().await {
                Some(ip) => ip.to_string(),
                None => {
                    log::warn!(
                        "could not detect controller address, using {}",
                        FALLBACK_CONTROLLER_IP
                    );
                    FALLBACK_CONTROLLER_IP.to_string()
                }
            },
        };

        let workspace = match pick(&args.workspace, "WORKSPACE") {
            Some(dir) => absolute(Path::new(&dir))?,
            None => home.join("workspace"),
        };

        let path_trove = env
            .var("PATH_TROVE")
            .map(PathBuf::from)
            .unwrap_or_else(|| workspace.join("trove"));
        let path_diskimage_builder = env
            .var("PATH_DISKIMAGEBUILDER")
            .map(PathBuf::from)
            .unwrap_or_else(|| workspace.join("diskimage-builder"));
        let path_tripleo_elements = env
            .var("PATH_TRIPLEO_ELEMENTS")
            .map(PathBuf::from)
            .unwrap_or_else(|| workspace.join("tripleo-image-elements"));
        let ssh_dir = env
            .var("SSH_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|| home.join(".ssh"));
        let guest_logdir = env
            .var("GUEST_LOGDIR")
            .unwrap_or_else(|| DEFAULT_GUEST_LOGDIR.to_string());

        let elements_path = env.var("ELEMENTS_PATH").unwrap_or_else(|| {
            [
                path_trove.join("integration/scripts/files/elements"),
                path_diskimage_builder.join("elements"),
                path_tripleo_elements.join("elements"),
            ]
            .iter()
            .map(|dir| dir.display().to_string())
            .collect::<Vec<_>>()
            .join(":")
        });

        let distro = pick(&args.distro, "DISTRO").unwrap_or_else(|| DEFAULT_DISTRO.to_string());
        let distro_release = pick(&args.distro_release, "DISTRO_RELEASE")
            .unwrap_or_else(|| DEFAULT_DISTRO_RELEASE.to_string());
        let datastore =
            pick(&args.datastore, "DATASTORE").unwrap_or_else(|| DEFAULT_DATASTORE.to_string());
        let extra_elements: Vec<String> = pick(&args.extra_elements, "EXTRA_ELEMENTS")
            .map(|list| list.split_whitespace().map(str::to_string).collect())
            .unwrap_or_default();

        let output = match pick(&args.output, "OUTPUT_IMAGE") {
            Some(path) => absolute(Path::new(&path))?,
            None => workspace
                .join("images")
                .join(format!("trove-{}-{}-{}", distro, distro_release, datastore)),
        };
        let log_dir = match pick(&args.log_dir, "LOG_DIR") {
            Some(dir) => absolute(Path::new(&dir))?,
            None => workspace.join("logs"),
        };
        let log_path = log_dir.join(format!(
            "dib-{}-{}-{}.log",
            distro, distro_release, datastore
        ));

        let qemu_img_options: Vec<String> = env
            .var("QEMU_IMG_OPTIONS")
            .map(|opts| opts.split_whitespace().map(str::to_string).collect())
            .unwrap_or_else(|| {
                DEFAULT_QEMU_IMG_OPTIONS
                    .iter()
                    .map(|opt| opt.to_string())
                    .collect()
            });
        let image_builder = env
            .var("DISK_IMAGE_CREATE")
            .unwrap_or_else(|| DEFAULT_IMAGE_BUILDER.to_string());

        let escaped_path_trove = escape_slashes(&path_trove.display().to_string());
        let escaped_guest_logdir = escape_slashes(&guest_logdir);

        Ok(Self {
            host_username,
            host_scp_username,
            guest_username,
            controller_ip,
            workspace,
            path_trove,
            escaped_path_trove,
            path_diskimage_builder,
            path_tripleo_elements,
            ssh_dir,
            guest_logdir,
            escaped_guest_logdir,
            elements_path,
            distro,
            distro_release,
            datastore,
            extra_elements,
            output,
            log_dir,
            log_path,
            qemu_img_options,
            image_builder,
            debug: args.debug,
            passthrough: args.passthrough.clone(),
        })
    }

    /// Element names handed to the builder, in build order.
    pub fn elements(&self) -> Vec<String> {
        let release = format!("{}-{}", self.distro, self.distro_release);
        let mut elements = vec![
            self.distro.clone(),
            "vm".to_string(),
            "cloud-init-datasources".to_string(),
            format!("{}-guest", release),
            format!("{}-{}", release, self.datastore),
        ];
        elements.extend(self.extra_elements.iter().cloned());
        elements
    }

    /// Variables exported into the builder's environment.
    ///
    /// Elements read these while rendering guest configuration.
    pub fn exported_env(&self) -> Vec<(&'static str, String)> {
        vec![
            ("HOST_USERNAME", self.host_username.clone()),
            ("HOST_SCP_USERNAME", self.host_scp_username.clone()),
            ("GUEST_USERNAME", self.guest_username.clone()),
            ("CONTROLLER_IP", self.controller_ip.clone()),
            ("PATH_TROVE", self.path_trove.display().to_string()),
            ("ESCAPED_PATH_TROVE", self.escaped_path_trove.clone()),
            ("SSH_DIR", self.ssh_dir.display().to_string()),
            ("GUEST_LOGDIR", self.guest_logdir.clone()),
            ("ESCAPED_GUEST_LOGDIR", self.escaped_guest_logdir.clone()),
            ("ELEMENTS_PATH", self.elements_path.clone()),
            ("DIB_CLOUD_INIT_DATASOURCES", CLOUD_INIT_DATASOURCES.to_string()),
            ("DISTRO_NAME", self.distro.clone()),
            ("DIB_RELEASE", self.distro_release.clone()),
            ("SERVICE_TYPE", self.datastore.clone()),
        ]
    }

    /// Every resolved setting as `(NAME, value)`, in display order.
    pub fn summary(&self) -> Vec<(&'static str, String)> {
        let mut entries = self.exported_env();
        entries.extend([
            ("WORKSPACE", self.workspace.display().to_string()),
            (
                "PATH_DISKIMAGEBUILDER",
                self.path_diskimage_builder.display().to_string(),
            ),
            (
                "PATH_TRIPLEO_ELEMENTS",
                self.path_tripleo_elements.display().to_string(),
            ),
            ("DISTRO", self.distro.clone()),
            ("DISTRO_RELEASE", self.distro_release.clone()),
            ("DATASTORE", self.datastore.clone()),
            ("EXTRA_ELEMENTS", self.extra_elements.join(" ")),
            ("QEMU_IMG_OPTIONS", self.qemu_img_options.join(" ")),
            ("IMAGE_FORMAT", IMAGE_FORMAT.to_string()),
            ("OUTPUT_IMAGE", self.output.display().to_string()),
            ("LOG_DIR", self.log_dir.display().to_string()),
            ("LOG_PATH", self.log_path.display().to_string()),
            ("DISK_IMAGE_CREATE", self.image_builder.clone()),
        ]);
        entries
    }
}

/// Escapes every `/` as `\/` for sed-style substitution inside elements.
pub fn escape_slashes(path: &str) -> String {
    path.replace('/', "\\/")
}

fn absolute(path: &Path) -> Result<PathBuf> {
    let absolute = path
        .absolutize()
        .with_context(|| format!("cannot resolve path {}", path.display()))?;
    Ok(absolute.into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        let mut map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        map.entry("HOME".into()).or_insert_with(|| "/home/dev".into());
        map.entry("USER".into()).or_insert_with(|| "dev".into());
        map.entry("CONTROLLER_IP".into())
            .or_insert_with(|| "10.1.2.3".into());
        map
    }

    #[tokio::test]
    async fn defaults_are_applied_when_nothing_is_set() {
        let config = BuildConfig::resolve(&Args::default(), &env(&[])).await.unwrap();

        assert_eq!(config.host_username, "dev");
        assert_eq!(config.host_scp_username, "dev");
        assert_eq!(config.guest_username, "ubuntu");
        assert_eq!(config.controller_ip, "10.1.2.3");
        assert_eq!(config.workspace, PathBuf::from("/home/dev/workspace"));
        assert_eq!(config.path_trove, PathBuf::from("/home/dev/workspace/trove"));
        assert_eq!(config.escaped_path_trove, r"\/home\/dev\/workspace\/trove");
        assert_eq!(config.ssh_dir, PathBuf::from("/home/dev/.ssh"));
        assert_eq!(config.guest_logdir, "/var/log/trove/");
        assert_eq!(config.escaped_guest_logdir, r"\/var\/log\/trove\/");
        assert_eq!(
            config.elements_path,
            "/home/dev/workspace/trove/integration/scripts/files/elements:\
             /home/dev/workspace/diskimage-builder/elements:\
             /home/dev/workspace/tripleo-image-elements/elements"
        );
        assert_eq!(config.distro, "ubuntu");
        assert_eq!(config.distro_release, "xenial");
        assert_eq!(config.datastore, "mariadb");
        assert!(config.extra_elements.is_empty());
        assert_eq!(
            config.output,
            PathBuf::from("/home/dev/workspace/images/trove-ubuntu-xenial-mariadb")
        );
        assert_eq!(config.log_dir, PathBuf::from("/home/dev/workspace/logs"));
        assert_eq!(
            config.log_path,
            PathBuf::from("/home/dev/workspace/logs/dib-ubuntu-xenial-mariadb.log")
        );
        assert_eq!(config.qemu_img_options, vec!["--qemu-img-options", "compat=1.1"]);
        assert_eq!(config.image_builder, "disk-image-create");
        assert!(!config.debug);
    }

    #[tokio::test]
    async fn flags_take_precedence_over_environment() {
        let args = Args {
            distro: Some("centos".into()),
            datastore: Some("mysql".into()),
            controller_ip: Some("192.168.0.9".into()),
            ..Args::default()
        };
        let env = env(&[
            ("DISTRO", "fedora"),
            ("DISTRO_RELEASE", "7"),
            ("DATASTORE", "postgresql"),
        ]);

        let config = BuildConfig::resolve(&args, &env).await.unwrap();

        assert_eq!(config.distro, "centos");
        assert_eq!(config.datastore, "mysql");
        assert_eq!(config.distro_release, "7");
        assert_eq!(config.controller_ip, "192.168.0.9");
        assert_eq!(config.log_path.file_name().unwrap(), "dib-centos-7-mysql.log");
    }

    #[tokio::test]
    async fn environment_overrides_defaults_and_derived_paths_follow() {
        let env = env(&[
            ("WORKSPACE", "/srv/build"),
            ("HOST_USERNAME", "stack"),
            ("GUEST_USERNAME", "trove"),
            ("PATH_TROVE", "/opt/stack/trove"),
            ("GUEST_LOGDIR", "/var/log/guest"),
            ("EXTRA_ELEMENTS", "  pip-cache   local-config "),
        ]);

        let config = BuildConfig::resolve(&Args::default(), &env).await.unwrap();

        assert_eq!(config.host_username, "stack");
        assert_eq!(config.host_scp_username, "stack");
        assert_eq!(config.guest_username, "trove");
        assert_eq!(config.escaped_path_trove, r"\/opt\/stack\/trove");
        assert_eq!(config.escaped_guest_logdir, r"\/var\/log\/guest");
        assert!(config
            .elements_path
            .starts_with("/opt/stack/trove/integration/scripts/files/elements:/srv/build/"));
        assert_eq!(config.extra_elements, vec!["pip-cache", "local-config"]);
        assert_eq!(config.log_dir, PathBuf::from("/srv/build/logs"));
    }

    #[tokio::test]
    async fn empty_environment_values_count_as_unset() {
        let env = env(&[("DISTRO", ""), ("LOG_DIR", "")]);
        let config = BuildConfig::resolve(&Args::default(), &env).await.unwrap();
        assert_eq!(config.distro, "ubuntu");
        assert_eq!(config.log_dir, PathBuf::from("/home/dev/workspace/logs"));
    }

    #[tokio::test]
    async fn explicit_elements_path_is_used_verbatim() {
        let env = env(&[("ELEMENTS_PATH", "/a:/b")]);
        let config = BuildConfig::resolve(&Args::default(), &env).await.unwrap();
        assert_eq!(config.elements_path, "/a:/b");
    }

    #[tokio::test]
    async fn elements_are_ordered_with_extras_last() {
        let args = Args {
            extra_elements: Some("pip-cache local-config".into()),
            ..Args::default()
        };
        let config = BuildConfig::resolve(&args, &env(&[])).await.unwrap();

        assert_eq!(
            config.elements(),
            vec![
                "ubuntu",
                "vm",
                "cloud-init-datasources",
                "ubuntu-xenial-guest",
                "ubuntu-xenial-mariadb",
                "pip-cache",
                "local-config",
            ]
        );
    }

    #[tokio::test]
    async fn summary_lists_every_setting_once() {
        let config = BuildConfig::resolve(&Args::default(), &env(&[])).await.unwrap();
        let summary = config.summary();
        let mut names: Vec<_> = summary.iter().map(|(name, _)| *name).collect();
        let total = names.len();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), total);
        assert!(summary.contains(&("DIB_CLOUD_INIT_DATASOURCES", "ConfigDrive".to_string())));
        assert!(summary.contains(&("DISTRO", "ubuntu".to_string())));
    }

    #[tokio::test]
    async fn missing_home_still_yields_absolute_paths() {
        let env: HashMap<String, String> = [("CONTROLLER_IP", "10.1.2.3")]
            .into_iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();

        let config = BuildConfig::resolve(&Args::default(), &env).await.unwrap();

        assert!(config.workspace.is_absolute());
        assert!(config.workspace.ends_with("workspace"));
        assert!(config.ssh_dir.is_absolute());
        assert!(config.output.is_absolute());
        assert!(config.log_path.is_absolute());
    }

    #[test]
    fn escaping_replaces_every_separator() {
        assert_eq!(escape_slashes("/a/b/"), r"\/a\/b\/");
        assert_eq!(escape_slashes("relative"), "relative");
    }
}
