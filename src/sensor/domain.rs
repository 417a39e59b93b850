//! Dominio del sensor: mensajes crudos y documento de configuración.
//!
//! Este módulo define el vocabulario de la capa de adquisición: el mensaje
//! binario de longitud fija que emite el sensor, la muestra (un período
//! completo de mensajes) y el documento YAML que describe cómo interpretar
//! esos bytes y hacia qué tabla remota se suben los registros.
//!
//! # Funcionalidades Principales
//! * **Carga de Configuración:** Lee y deserializa el documento YAML del sensor.
//! * **Validación:** Rechaza configuraciones que harían fallar la decodificación
//!   o la subida antes de arrancar el bucle.
//! * **Identidad de Tabla:** Construye el identificador calificado de la tabla destino.


use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;
use serde::Deserialize;


/// Un mensaje crudo del sensor: exactamente `message_length` bytes.
pub type Message = Vec<u8>;

/// Una muestra: exactamente `period` mensajes de un mismo ciclo de agregación.
pub type Sample = Vec<Message>;


/// Orden de bytes con el que el sensor codifica sus valores.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ByteOrder {
    Little,
    Big,
}


/// Describe cómo extraer un valor de un mensaje crudo.
///
/// `start` y `length` delimitan la ventana de bytes dentro del mensaje;
/// `scale` permite decodificar valores fraccionarios codificados como enteros
/// de punto fijo (ej. décimas de µg/m³).
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct FieldSpec {
    pub start: usize,
    pub length: usize,
    pub scale: Option<f64>,
}


/// Identidad de la tabla remota destino.
#[derive(Debug, Clone, Deserialize)]
pub struct DestinationConfig {
    pub owner: String,
    pub name: String,
    pub table_name: String,
}


impl DestinationConfig {

    /// Identificador de tabla calificado por esquema, listo para interpolar
    /// en la sentencia INSERT.
    pub fn qualified_table(&self) -> String {
        format!(r#""{}/{}"."{}""#, self.owner, self.name, self.table_name)
    }
}


fn default_read_timeout_secs() -> u64 {
    60
}


/// Documento de configuración del sensor y del destino de subida.
///
/// Esta estructura es la fuente única de verdad para el bucle de adquisición:
/// describe el puerto serie, el formato binario de los mensajes, las mediciones
/// a decodificar y el orden exacto de columnas de la tabla remota.
///
#[derive(Debug, Clone, Deserialize)]
pub struct SensorConfig {
    /// Etiqueta fija de ubicación que acompaña a cada registro.
    pub location: String,

    /// Ruta del dispositivo serie (ej. `/dev/ttyUSB0`).
    pub port_device: String,

    /// Endianness de todos los campos del mensaje.
    pub byte_order: ByteOrder,

    /// Longitud fija, en bytes, de cada mensaje del sensor.
    pub message_length: usize,

    /// Cantidad de mensajes promediados por registro. Debe ser mayor que cero.
    pub period: usize,

    /// Límite del buffer de reintentos; superarlo termina el proceso.
    pub max_retries: usize,

    /// Timeout de lectura del puerto serie, en segundos.
    /// Por defecto: `60`.
    #[serde(default = "default_read_timeout_secs")]
    pub read_timeout_secs: u64,

    /// Ventana de bytes que identifica al sensor dentro del mensaje.
    pub sensor_id: FieldSpec,

    /// Mediciones a decodificar, por nombre de columna.
    pub measurements: BTreeMap<String, FieldSpec>,

    /// Columnas de la tabla destino, en el orden exacto del esquema remoto.
    pub columns: Vec<String>,

    /// Tabla remota hacia la que se suben los registros.
    pub destination: DestinationConfig,
}


/// Errores de carga y validación del documento de configuración.
#[derive(Debug)]
pub enum ConfigError {
    Io(std::io::Error),
    Yaml(serde_yaml::Error),
    Invalid(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Io(e) => write!(f, "error de E/S leyendo la configuración: {}", e),
            ConfigError::Yaml(e) => write!(f, "error de YAML en la configuración: {}", e),
            ConfigError::Invalid(msg) => write!(f, "configuración inválida: {}", msg),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::Io(e) => Some(e),
            ConfigError::Yaml(e) => Some(e),
            ConfigError::Invalid(_) => None,
        }
    }
}

impl From<std::io::Error> for ConfigError {
    fn from(e: std::io::Error) -> Self {
        ConfigError::Io(e)
    }
}

impl From<serde_yaml::Error> for ConfigError {
    fn from(e: serde_yaml::Error) -> Self {
        ConfigError::Yaml(e)
    }
}


impl SensorConfig {

    /// Deserializa la configuración desde una cadena YAML y la valida.
    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigError> {
        let config: SensorConfig = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Carga la configuración desde un archivo YAML.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Verifica los invariantes que el bucle de adquisición asume.
    ///
    /// # Comportamiento
    /// * `period` y `message_length` deben ser mayores que cero: el promedio
    ///   divide por `period` y la lectura pide `message_length` bytes.
    /// * Toda ventana de bytes (sensor_id y mediciones) debe caber dentro del
    ///   mensaje y ocupar entre 1 y 8 bytes. Con esto, un mensaje leído del
    ///   stream nunca puede producir una decodificación fuera de rango.
    /// * Toda columna configurada debe resolverse a un campo de identidad
    ///   (`location`, `sensor_id`, `datetime`) o a una medición configurada.
    pub fn validate(&self) -> Result<(), ConfigError> {

        if self.period == 0 {
            return Err(ConfigError::Invalid("period debe ser mayor que cero".into()));
        }

        if self.message_length == 0 {
            return Err(ConfigError::Invalid("message_length debe ser mayor que cero".into()));
        }

        self.validate_field("sensor_id", &self.sensor_id)?;
        for (name, spec) in &self.measurements {
            self.validate_field(name, spec)?;
        }

        if self.columns.is_empty() {
            return Err(ConfigError::Invalid("columns no puede estar vacío".into()));
        }

        for column in &self.columns {
            let known = matches!(column.as_str(), "location" | "sensor_id" | "datetime")
                || self.measurements.contains_key(column);
            if !known {
                return Err(ConfigError::Invalid(
                    format!("la columna '{}' no corresponde a ningún campo configurado", column)
                ));
            }
        }

        Ok(())
    }

    fn validate_field(&self, name: &str, spec: &FieldSpec) -> Result<(), ConfigError> {

        if spec.length == 0 || spec.length > 8 {
            return Err(ConfigError::Invalid(
                format!("el campo '{}' debe ocupar entre 1 y 8 bytes", name)
            ));
        }

        if spec.start + spec.length > self.message_length {
            return Err(ConfigError::Invalid(
                format!("el campo '{}' excede los {} bytes del mensaje", name, self.message_length)
            ));
        }

        Ok(())
    }
}
