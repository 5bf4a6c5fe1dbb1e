use std::convert::TryInto;
use std::io;
use std::io::BufRead;
use std::sync::atomic::AtomicBool;

use log::info;

use crate::cmd::opts::{
    CatCmd, CommitCmd, ConfigCmd, CopyCmd, DigestAlgorithm as OptAlgorithm, InitCmd, Layout,
    ListCmd, MoveCmd, NewCmd, PurgeCmd, RemoveCmd, ResetCmd, VaultflArgs, ShowCmd, Storage,
    StatusCmd,
};
use crate::cmd::{paint, print, println, style, Cmd, GlobalArgs};
use crate::config::Config;
use crate::ocfl::{DigestAlgorithm, LayoutExtensionName, OcflRepo, Result, VaultflError, StorageLayout};

impl Cmd for CatCmd {
    fn exec(
        &self,
        repo: &OcflRepo,
        _args: GlobalArgs,
        _config: &Config,
        _terminate: &AtomicBool,
    ) -> Result<()> {
        if self.staged {
            repo.get_staged_object_file(
                &self.object_id,
                &self.path.as_str().try_into()?,
                &mut io::stdout(),
            )
        } else {
            repo.get_object_file(
                &self.object_id,
                &self.path.as_str().try_into()?,
                self.version,
                &mut io::stdout(),
            )
        }
    }
}

pub(crate) fn init_repo(cmd: &InitCmd, args: &VaultflArgs, config: &Config) -> Result<()> {
    let root = args
        .root
        .clone()
        .or_else(|| config.root.clone())
        .unwrap_or_else(|| ".".to_string());

    match args.target_storage(config) {
        Storage::FileSystem => {
            OcflRepo::init_fs_repo(&root, create_layout(cmd.layout, cmd.config_file.as_deref())?)?;
        }
        #[cfg(feature = "s3")]
        Storage::S3 { .. } => {
            return Err(VaultflError::IllegalArgument(
                "Initializing S3 repositories from the CLI is not yet supported".to_string(),
            ));
        }
        #[cfg(not(feature = "s3"))]
        Storage::S3 { .. } => {
            return Err(VaultflError::IllegalArgument(
                "This build was compiled without S3 support".to_string(),
            ));
        }
    }

    if !args.quiet {
        println("Initialized OCFL repository")?;
    }

    Ok(())
}

fn create_layout(
    layout: Layout,
    config_file: Option<&std::path::Path>,
) -> Result<StorageLayout> {
    let config_bytes = config_file.map(std::fs::read).transpose()?;

    match layout {
        Layout::None => Err(VaultflError::IllegalArgument(
            "A storage layout extension must be specified to initialize a repository".to_string(),
        )),
        Layout::FlatDirect => {
            StorageLayout::new(LayoutExtensionName::FlatDirectLayout, config_bytes.as_deref())
        }
        Layout::HashedNTuple => {
            StorageLayout::new(LayoutExtensionName::HashedNTupleLayout, config_bytes.as_deref())
        }
        Layout::HashedNTupleObjectId => StorageLayout::new(
            LayoutExtensionName::HashedNTupleObjectIdLayout,
            config_bytes.as_deref(),
        ),
        Layout::FlatOmitPrefix => StorageLayout::new(
            LayoutExtensionName::FlatOmitPrefixLayout,
            config_bytes.as_deref(),
        ),
        Layout::NTupleOmitPrefix => StorageLayout::new(
            LayoutExtensionName::NTupleOmitPrefixLayout,
            config_bytes.as_deref(),
        ),
    }
}

impl Cmd for InitCmd {
    fn exec(
        &self,
        _repo: &OcflRepo,
        _args: GlobalArgs,
        _config: &Config,
        _terminate: &AtomicBool,
    ) -> Result<()> {
        // Initialization happens before the repository handle exists; `crate::cmd::exec_command`
        // special-cases `Command::Init` and calls `init_repo()` directly instead of going through
        // this impl, which only exists so `Command` can derive `enum_dispatch(Cmd)`.
        Err(VaultflError::IllegalState(
            "init must be dispatched before a repository is opened".to_string(),
        ))
    }
}

impl Cmd for NewCmd {
    fn exec(
        &self,
        repo: &OcflRepo,
        _args: GlobalArgs,
        _config: &Config,
        _terminate: &AtomicBool,
    ) -> Result<()> {
        repo.create_object(
            &self.object_id,
            algorithm(self.digest_algorithm),
            &self.content_directory,
            self.zero_padding,
        )?;

        info!("Staged new OCFL object {}", self.object_id);

        Ok(())
    }
}

impl Cmd for CopyCmd {
    fn exec(
        &self,
        repo: &OcflRepo,
        _args: GlobalArgs,
        _config: &Config,
        _terminate: &AtomicBool,
    ) -> Result<()> {
        if self.internal {
            repo.copy_files_internal(
                &self.object_id,
                self.version,
                &self.source,
                &self.destination,
                self.recursive,
            )
        } else {
            repo.copy_files_external(
                &self.object_id,
                &self.source,
                &self.destination,
                self.recursive,
            )
        }
    }
}

impl Cmd for MoveCmd {
    fn exec(
        &self,
        repo: &OcflRepo,
        _args: GlobalArgs,
        _config: &Config,
        _terminate: &AtomicBool,
    ) -> Result<()> {
        if self.internal {
            repo.move_files_internal(&self.object_id, &self.source, &self.destination)
        } else {
            repo.move_files_external(&self.object_id, &self.source, &self.destination)
        }
    }
}

impl Cmd for RemoveCmd {
    fn exec(
        &self,
        repo: &OcflRepo,
        _args: GlobalArgs,
        _config: &Config,
        _terminate: &AtomicBool,
    ) -> Result<()> {
        repo.remove_files(&self.object_id, &self.paths, self.recursive)
    }
}

impl Cmd for ResetCmd {
    fn exec(
        &self,
        repo: &OcflRepo,
        _args: GlobalArgs,
        _config: &Config,
        _terminate: &AtomicBool,
    ) -> Result<()> {
        if self.paths.is_empty() {
            repo.reset_all(&self.object_id)
        } else {
            repo.reset(&self.object_id, &self.paths, self.recursive)
        }
    }
}

impl Cmd for CommitCmd {
    fn exec(
        &self,
        repo: &OcflRepo,
        _args: GlobalArgs,
        config: &Config,
        _terminate: &AtomicBool,
    ) -> Result<()> {
        let user_name = self.user_name.clone().or_else(|| config.author_name.clone());
        let user_address = self
            .user_address
            .clone()
            .or_else(|| config.author_address.clone());

        repo.commit(
            &self.object_id,
            user_name.as_deref(),
            user_address.as_deref(),
            self.message.as_deref(),
            self.created,
        )?;

        Ok(())
    }
}

impl Cmd for StatusCmd {
    fn exec(
        &self,
        repo: &OcflRepo,
        args: GlobalArgs,
        config: &Config,
        terminate: &AtomicBool,
    ) -> Result<()> {
        if let Some(object_id) = self.object_id.as_ref() {
            let cmd = ShowCmd {
                object_id: object_id.to_string(),
                version: None,
                staged: true,
                minimal: false,
            };
            cmd.exec(repo, args, config, terminate)
        } else {
            let cmd = ListCmd {
                logical_dirs: false,
                object_id: None,
                version: None,
                path: None,
                staged: true,
                digest: false,
                objects: false,
                header: true,
                long: true,
                reverse: false,
                physical: false,
                tsv: false,
                sort: crate::cmd::opts::Field::Default,
            };

            cmd.exec(repo, args, config, terminate)
        }
    }
}

impl Cmd for PurgeCmd {
    fn exec(
        &self,
        repo: &OcflRepo,
        _args: GlobalArgs,
        _config: &Config,
        _terminate: &AtomicBool,
    ) -> Result<()> {
        if !self.force {
            print(format!("Permanently delete '{}'? [y/N]: ", self.object_id))?;
            let mut response = String::new();
            io::stdin().lock().read_line(&mut response)?;
            if !response.trim().eq_ignore_ascii_case("y") {
                println("Aborted")?;
                return Ok(());
            }
        }

        repo.purge_object(&self.object_id)
    }
}

impl Cmd for ConfigCmd {
    fn exec(
        &self,
        _repo: &OcflRepo,
        args: GlobalArgs,
        config: &Config,
        _terminate: &AtomicBool,
    ) -> Result<()> {
        let heading = |label: &str| paint(args.no_styles, *style::BOLD, label);

        match crate::config::config_path() {
            Some(path) => println(format!("{}: {}", heading("Config file"), path.display()))?,
            None => println(format!("{}: unavailable on this platform", heading("Config file")))?,
        }

        println(format!(
            "{}: {}",
            heading("Author name"),
            config.author_name.as_deref().unwrap_or("<not set>")
        ))?;
        println(format!(
            "{}: {}",
            heading("Author address"),
            config.author_address.as_deref().unwrap_or("<not set>")
        ))?;
        println(format!(
            "{}: {}",
            heading("Root"),
            config.root.as_deref().unwrap_or("<not set>")
        ))?;
        println(format!(
            "{}: {}",
            heading("Staging root"),
            config.staging_root.as_deref().unwrap_or("<not set>")
        ))?;
        println(format!(
            "{}: {}",
            heading("Bucket"),
            config.bucket.as_deref().unwrap_or("<not set>")
        ))
    }
}

impl Cmd for crate::cmd::opts::UpgradeCmd {
    fn exec(
        &self,
        _repo: &OcflRepo,
        _args: GlobalArgs,
        _config: &Config,
        _terminate: &AtomicBool,
    ) -> Result<()> {
        Err(VaultflError::IllegalState(
            "Upgrading the spec version of an existing repository or object is not yet supported"
                .to_string(),
        ))
    }
}

fn algorithm(algorithm: OptAlgorithm) -> DigestAlgorithm {
    match algorithm {
        OptAlgorithm::Sha256 => DigestAlgorithm::Sha256,
        OptAlgorithm::Sha512 => DigestAlgorithm::Sha512,
    }
}

pub fn exec_init(cmd: &InitCmd, args: &VaultflArgs, config: &Config) -> Result<()> {
    init_repo(cmd, args, config)
}
