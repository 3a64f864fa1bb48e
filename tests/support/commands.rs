//! Command helper methods for Test.

use super::Test;
use assert_cmd::Command;
use std::process::Output;

impl Test {
    /// Create a fleetssh command bound to this environment.
    ///
    /// Returns a Command configured with:
    /// - `--home` pointing at the temporary administration root
    /// - `NO_COLOR` so output can be matched verbatim
    /// - the scratch directory as working directory
    pub fn cmd(&self) -> Command {
        #[allow(deprecated)]
        let mut cmd = Command::cargo_bin("fleetssh").expect("failed to find fleetssh binary");
        cmd.arg("--home").arg(self.home.path());
        cmd.env("NO_COLOR", "1");
        cmd.env_remove("FLEETSSH_HOME");
        cmd.env_remove("FLEETSSH_LOG");
        cmd.current_dir(self.dir.path());
        cmd
    }

    /// Run fleetssh with `args`.
    pub fn run(&self, args: &[&str]) -> Output {
        self.cmd()
            .args(args)
            .output()
            .expect("failed to run fleetssh")
    }

    /// Shortcut for `fleetssh group list`.
    pub fn group_list(&self) -> Output {
        self.run(&["group", "list"])
    }

    /// Shortcut for `fleetssh group list --json`.
    pub fn group_list_json(&self) -> Output {
        self.run(&["group", "list", "--json"])
    }

    /// Shortcut for `fleetssh group members <group> --json`.
    pub fn group_members_json(&self, group: &str) -> Output {
        self.run(&["group", "members", group, "--json"])
    }

    /// Shortcut for `fleetssh group delete <group>`.
    pub fn group_delete(&self, group: &str) -> Output {
        self.run(&["group", "delete", group])
    }

    /// Shortcut for `fleetssh device remove <serial>`.
    pub fn device_remove(&self, serial: &str) -> Output {
        self.run(&["device", "remove", serial])
    }
}
