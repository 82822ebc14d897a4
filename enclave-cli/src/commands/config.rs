use anyhow::Result;
use enclave_config::{ConfigLoader, EnclaveConfig};
use std::path::Path;
use tracing::{error, info};

/// Handle configuration validation
pub fn config_validate_command(config_file: &Path) -> Result<()> {
    info!("Validating configuration file: {:?}", config_file);

    if !config_file.exists() {
        return Err(anyhow::anyhow!(
            "Configuration file not found: {:?}",
            config_file
        ));
    }

    match ConfigLoader::new().from_file(config_file) {
        Ok(config) => {
            println!("✅ Configuration file is valid");
            println!(
                "   connection: {} | max message size: {} bytes | ack timeout: {}s",
                config.connection.kind,
                config.transport.max_message_size,
                config.transport.ack_timeout.as_secs()
            );
            info!("Configuration validation passed");
            Ok(())
        }
        Err(e) => {
            println!("❌ Configuration validation failed: {}", e);
            error!("Configuration validation failed: {}", e);
            Err(e.into())
        }
    }
}

/// Print a sample configuration
pub fn config_generate_command() -> Result<()> {
    print!("{}", EnclaveConfig::generate_sample());
    Ok(())
}
