//! Decodificación de valores numéricos desde mensajes binarios.


use crate::sensor::domain::{ByteOrder, FieldSpec};


/// Interpreta la ventana de bytes del campo como un entero sin signo.
///
/// Función pura y determinista. La validación de la configuración garantiza
/// que la ventana cabe en el mensaje y ocupa a lo sumo 8 bytes; un mensaje
/// más corto que `start + length` provoca un panic por índice fuera de rango.
///
/// # Argumentos
/// * `data`: Un mensaje completo del sensor.
/// * `byte_order`: Endianness de los bytes del campo.
/// * `spec`: Ventana de bytes a interpretar.
///
/// # Retorno
/// El valor crudo del campo, sin escalar.
pub fn decode_raw(data: &[u8],
                  byte_order: ByteOrder,
                  spec: &FieldSpec) -> u64 {

    let window = &data[spec.start..spec.start + spec.length];

    match byte_order {
        ByteOrder::Big => window.iter()
            .fold(0u64, |acc, b| (acc << 8) | u64::from(*b)),
        ByteOrder::Little => window.iter().rev()
            .fold(0u64, |acc, b| (acc << 8) | u64::from(*b)),
    }
}


/// Decodifica el campo y aplica su factor de escala, si lo tiene.
///
/// `scale` soporta valores fraccionarios codificados como enteros de punto
/// fijo; sin escala, el retorno es el valor crudo como flotante.
pub fn decode_value(data: &[u8],
                    byte_order: ByteOrder,
                    spec: &FieldSpec) -> f64 {

    let raw = decode_raw(data, byte_order, spec) as f64;

    match spec.scale {
        Some(scale) => raw * scale,
        None => raw,
    }
}
