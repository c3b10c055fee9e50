//! CLI configuration.

use std::{env, path::PathBuf, time::Duration};

use anyhow::{Context, Result};
use stealthdrop_common::{
    ArtifactSpec, KZG_PARAMS_NAME, KZG_PARAMS_URL, PROVING_KEY_NAME, PROVING_KEY_URL,
    VERIFYING_KEY_NAME, VERIFYING_KEY_URL,
};
use stealthdrop_workflow::{WorkflowConfig, CELEBRATION_DURATION};

#[derive(Clone, Debug)]
pub struct StealthdropConfig {
    /// Directory of the durable artifact store.
    pub data_dir: PathBuf,
    pub verifying_key_url: String,
    pub proving_key_url: String,
    pub kzg_params_url: String,
    /// Wallet JSON-RPC endpoint.
    pub rpc_url: Option<String>,
    pub celebration: Duration,
    pub action_timeout: Option<Duration>,
}

impl StealthdropConfig {
    /// Load configuration from `STEALTHDROP_*` environment variables.
    pub fn from_env() -> Result<Self> {
        let data_dir = env::var("STEALTHDROP_DATA_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("stealthdrop-data"));

        let verifying_key_url =
            env::var("STEALTHDROP_VK_URL").unwrap_or_else(|_| VERIFYING_KEY_URL.to_string());
        let proving_key_url =
            env::var("STEALTHDROP_PK_URL").unwrap_or_else(|_| PROVING_KEY_URL.to_string());
        let kzg_params_url =
            env::var("STEALTHDROP_KZG_URL").unwrap_or_else(|_| KZG_PARAMS_URL.to_string());

        let rpc_url = env::var("STEALTHDROP_RPC_URL").ok();

        let celebration = match env::var("STEALTHDROP_CELEBRATION_MS") {
            Ok(raw) => Duration::from_millis(
                raw.parse()
                    .with_context(|| format!("invalid STEALTHDROP_CELEBRATION_MS: {raw}"))?,
            ),
            Err(_) => CELEBRATION_DURATION,
        };

        let action_timeout = env::var("STEALTHDROP_ACTION_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse().ok())
            .map(Duration::from_secs);

        Ok(Self {
            data_dir,
            verifying_key_url,
            proving_key_url,
            kzg_params_url,
            rpc_url,
            celebration,
            action_timeout,
        })
    }

    /// Claim keys, in the order the proving context loads them.
    pub fn key_artifacts(&self) -> Vec<ArtifactSpec> {
        vec![
            ArtifactSpec::new(VERIFYING_KEY_NAME, &self.verifying_key_url),
            ArtifactSpec::new(PROVING_KEY_NAME, &self.proving_key_url),
        ]
    }

    /// Keys first, then the KZG params.
    pub fn artifacts(&self) -> Vec<ArtifactSpec> {
        let mut specs = self.key_artifacts();
        specs.push(ArtifactSpec::new(KZG_PARAMS_NAME, &self.kzg_params_url));
        specs
    }

    pub fn workflow(&self) -> WorkflowConfig {
        WorkflowConfig {
            celebration: self.celebration,
            action_timeout: self.action_timeout,
            key_artifacts: self.key_artifacts(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> StealthdropConfig {
        StealthdropConfig {
            data_dir: PathBuf::from("stealthdrop-data"),
            verifying_key_url: "https://mirror.test/vk.bin".into(),
            proving_key_url: "https://mirror.test/pk.bin".into(),
            kzg_params_url: "https://mirror.test/kzg.srs".into(),
            rpc_url: None,
            celebration: CELEBRATION_DURATION,
            action_timeout: None,
        }
    }

    #[test]
    fn workflow_downloads_keys_from_configured_urls() {
        let config = config();
        let workflow = config.workflow();

        assert_eq!(workflow.key_artifacts, config.artifacts()[..2].to_vec());
        assert_eq!(
            workflow.key_artifacts,
            vec![
                ArtifactSpec::new(VERIFYING_KEY_NAME, "https://mirror.test/vk.bin"),
                ArtifactSpec::new(PROVING_KEY_NAME, "https://mirror.test/pk.bin"),
            ]
        );
    }

    #[test]
    fn prefetch_list_ends_with_kzg_params() {
        let specs = config().artifacts();
        assert_eq!(specs.len(), 3);
        assert_eq!(
            specs[2],
            ArtifactSpec::new(KZG_PARAMS_NAME, "https://mirror.test/kzg.srs")
        );
    }
}
