//! Dominio del registro agregado listo para subir.
//!
//! Un `Record` es la fila que el servicio sube a la tabla remota: los campos
//! de identidad (`location`, `sensor_id`, `datetime`) más una entrada por
//! medición configurada, ya promediada sobre el período.


use std::collections::HashMap;
use std::fmt;
use chrono::{DateTime, Utc};


/// Valor tipado de una columna, enlazable como parámetro SQL.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Integer(i64),
    Float(f64),
    Text(String),
    Timestamp(DateTime<Utc>),
}


/// Error al proyectar un registro sobre las columnas configuradas.
#[derive(Debug)]
pub enum RecordError {
    MissingColumn(String),
}

impl fmt::Display for RecordError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecordError::MissingColumn(name) => {
                write!(f, "el registro no contiene la columna '{}'", name)
            }
        }
    }
}

impl std::error::Error for RecordError {}


/// Una fila agregada, como mapa de nombre de columna a valor.
///
/// El registro es dueño de todos sus datos: no conserva ninguna referencia a
/// la muestra de la que se derivó, por lo que puede vivir en el buffer de
/// reintentos hasta que su subida tenga éxito.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    pub values: HashMap<String, FieldValue>,
}


impl Record {

    pub fn new() -> Self {
        Self { values: HashMap::new() }
    }

    pub fn insert(&mut self, column: impl Into<String>, value: FieldValue) {
        self.values.insert(column.into(), value);
    }

    pub fn get(&self, column: &str) -> Option<&FieldValue> {
        self.values.get(column)
    }

    /// Proyecta el registro sobre las columnas configuradas, en su orden exacto.
    ///
    /// La tabla remota exige todas sus columnas presentes y ordenadas; una
    /// columna ausente es un error, nunca una omisión silenciosa.
    ///
    /// # Retorno
    /// * `Ok(Vec<FieldValue>)`: Los valores en el orden pedido.
    /// * `Err(RecordError::MissingColumn)`: Alguna columna configurada no existe
    ///   en el registro.
    pub fn as_row(&self, columns: &[String]) -> Result<Vec<FieldValue>, RecordError> {
        columns.iter()
            .map(|column| {
                self.values.get(column)
                    .cloned()
                    .ok_or_else(|| RecordError::MissingColumn(column.clone()))
            })
            .collect()
    }
}
