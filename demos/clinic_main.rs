use clinic_sim::clinic::config::ExperimentConfig;
use clinic_sim::{ReplicationDriver, SimError};
use log::info;
use std::time::Instant;

/// Usage: clinic_main [config.json]
fn main() -> Result<(), SimError> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = match std::env::args().nth(1) {
        Some(path) => {
            let text = std::fs::read_to_string(&path)
                .map_err(|e| SimError::Config(format!("{}: {}", path, e)))?;
            ExperimentConfig::from_json(&text)?
        }
        None => ExperimentConfig::default(),
    };
    info!(
        "{} nurses, {} general doctors, {} specialists, waiting room {}",
        config.clinic.num_nurses,
        config.clinic.num_general_doctors,
        config.clinic.num_specialist_doctors,
        config.clinic.waiting_room_capacity
    );

    let driver = ReplicationDriver::new(config.clinic, config.replications)?;
    let start_time = Instant::now();
    let summary = driver.run()?;
    info!("Completed in {} ms", start_time.elapsed().as_millis());

    println!();
    println!("{}", summary);
    Ok(())
}
