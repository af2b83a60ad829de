//! First-boot bootstrap script for sandbox instances.

/// Runs once via cloud-init on first boot: installs the download and TCP
/// utilities a sandbox session needs. Anything else is left to the user
/// over SSH.
pub const BOOTSTRAP_SCRIPT: &str = r#"#!/bin/bash
set -euo pipefail

sudo apt update -y
sudo apt install -y wget netcat-openbsd
"#;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn script_is_a_bash_script() {
        assert!(BOOTSTRAP_SCRIPT.starts_with("#!/bin/bash"));
        assert!(BOOTSTRAP_SCRIPT.contains("set -euo pipefail"));
    }

    #[test]
    fn script_installs_required_utilities() {
        assert!(BOOTSTRAP_SCRIPT.contains("wget"));
        assert!(BOOTSTRAP_SCRIPT.contains("netcat-openbsd"));
    }
}
