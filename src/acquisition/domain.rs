//! Dominio del bucle de adquisición: estados y colaboradores externos.
//!
//! El bucle habla con el mundo a través de dos interfaces angostas: la fuente
//! de mensajes (puerto serie en producción) y el destino de registros (la
//! tabla remota). Ambas se inyectan por constructor, lo que permite probar el
//! bucle de forma aislada con implementaciones en memoria.


use std::fmt;
use crate::record::domain::{FieldValue, RecordError};
use crate::sensor::domain::Message;


/// Estados del bucle de adquisición.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LoopState {
    /// Leyendo `period` mensajes para formar una muestra.
    Sampling,
    /// Intentando subir los registros del buffer.
    Draining,
    /// Salida por límite de reintentos superado.
    Terminated,
}


/// Fuente bloqueante de mensajes de longitud fija.
pub trait MessageSource {
    fn read_message(&mut self, length: usize) -> std::io::Result<Message>;
}


/// Destino de subida de registros ya proyectados sobre las columnas.
#[allow(async_fn_in_trait)]
pub trait RecordSink {
    async fn upload(&self,
                    qualified_table: &str,
                    row: Vec<FieldValue>) -> Result<(), sqlx::Error>;
}


/// Errores fatales del bucle; los fallos de subida no aparecen acá porque se
/// recuperan localmente vía el buffer de reintentos.
#[derive(Debug)]
pub enum AcquisitionError {
    /// La fuente de mensajes falló (timeout, desconexión, EOF).
    Source(std::io::Error),
    /// Un registro no cubre las columnas configuradas.
    Record(RecordError),
}

impl fmt::Display for AcquisitionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AcquisitionError::Source(e) => write!(f, "fallo de la fuente de mensajes: {}", e),
            AcquisitionError::Record(e) => write!(f, "registro incompleto: {}", e),
        }
    }
}

impl std::error::Error for AcquisitionError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            AcquisitionError::Source(e) => Some(e),
            AcquisitionError::Record(e) => Some(e),
        }
    }
}

impl From<std::io::Error> for AcquisitionError {
    fn from(e: std::io::Error) -> Self {
        AcquisitionError::Source(e)
    }
}

impl From<RecordError> for AcquisitionError {
    fn from(e: RecordError) -> Self {
        AcquisitionError::Record(e)
    }
}
