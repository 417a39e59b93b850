//! Construcción del registro agregado a partir de una muestra.


use chrono::Utc;
use crate::record::domain::{FieldValue, Record};
use crate::sensor::domain::{Sample, SensorConfig};
use crate::sensor::logic::{decode_raw, decode_value};


/// Construye un registro a partir de una muestra completa.
///
/// # Comportamiento
/// * `location` sale de la configuración estática.
/// * `sensor_id` se decodifica del **primer** mensaje de la muestra: entero
///   si el campo no tiene escala, flotante si la tiene.
/// * `datetime` es un único timestamp UTC tomado al momento de construir el
///   registro, no uno por mensaje.
/// * Cada medición se decodifica de **todos** los mensajes, se suma y se
///   divide por `period` (promedio del período, en coma flotante). La
///   validación de la configuración garantiza `period > 0`.
///
/// # Argumentos
/// * `sample`: La muestra completa; debe contener `period` mensajes.
/// * `config`: Documento de configuración validado.
pub fn build_record(sample: &Sample,
                    config: &SensorConfig) -> Record {

    let mut record = Record::new();

    record.insert("location", FieldValue::Text(config.location.clone()));

    let sensor_id = match config.sensor_id.scale {
        Some(_) => FieldValue::Float(decode_value(&sample[0], config.byte_order, &config.sensor_id)),
        None => FieldValue::Integer(decode_raw(&sample[0], config.byte_order, &config.sensor_id) as i64),
    };
    record.insert("sensor_id", sensor_id);

    record.insert("datetime", FieldValue::Timestamp(Utc::now()));

    for (name, spec) in &config.measurements {
        let sum: f64 = sample.iter()
            .map(|message| decode_value(message, config.byte_order, spec))
            .sum();
        record.insert(name.clone(), FieldValue::Float(sum / config.period as f64));
    }

    record
}
