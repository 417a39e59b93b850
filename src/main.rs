use std::time::Duration;
use tracing::{error, info};
use crate::acquisition::logic::Acquisition;
use crate::database::repository::Repository;
use crate::sensor::domain::SensorConfig;
use crate::serial::domain::SerialSource;
use crate::system::domain::{init_tracing, System};

mod acquisition;
mod buffer;
mod database;
mod record;
mod sensor;
mod serial;
mod system;


#[tokio::main]
async fn main() {

    let system = System::new()
        .expect("Error: no se pudo cargar la configuración de entorno");
    init_tracing(&system);

    info!("Info: iniciando serial_data_saver_service");

    let config = match SensorConfig::from_file(&system.sensor_config_path) {
        Ok(config) => config,
        Err(e) => {
            error!("Error: no se pudo cargar {}: {}", system.sensor_config_path, e);
            std::process::exit(1);
        }
    };

    let repo = Repository::create_repository(&system.database_url).await;

    let source = match SerialSource::open(&config.port_device,
                                          Duration::from_secs(config.read_timeout_secs)) {
        Ok(source) => source,
        Err(e) => {
            error!("Error: no se pudo abrir el puerto {}: {}", config.port_device, e);
            std::process::exit(1);
        }
    };

    let mut acquisition = Acquisition::new(source, repo, config);

    match acquisition.run().await {
        Ok(()) => info!("Info: proceso finalizado por límite de reintentos"),
        Err(e) => {
            error!("Error: fallo fatal en el bucle de adquisición. {}", e);
            std::process::exit(1);
        }
    }
}
