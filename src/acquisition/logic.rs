//! Bucle principal de adquisición y subida.
//!
//! Este módulo implementa la máquina de estados que alterna, dentro de una
//! misma iteración, la lectura de una muestra completa del sensor con el
//! drenaje del buffer de reintentos hacia la tabla remota.
//!
//! # Arquitectura
//! 1. **Sampling**: verifica el límite del buffer; si está dentro de la cota,
//!    lee `period` mensajes, construye un registro y lo encola.
//! 2. **Draining**: drena el buffer desde el extremo más reciente; un fallo
//!    de subida re-encola el registro y cede hasta el próximo ciclo.
//! 3. **Terminated**: única salida en operación normal, cuando el buffer
//!    superó `max_retries`.
//!
//! No hay paralelismo entre muestreo y subida: el bucle es una única tarea
//! secuencial y el buffer solo se toca desde acá, sin locks.


use tracing::{error, info};
use crate::acquisition::domain::{AcquisitionError, LoopState, MessageSource, RecordSink};
use crate::buffer::domain::RetryBuffer;
use crate::record::logic::build_record;
use crate::sensor::domain::{Sample, SensorConfig};


/// Bucle de adquisición con sus colaboradores inyectados por constructor.
pub struct Acquisition<S, R> {
    source: S,
    sink: R,
    config: SensorConfig,
    buffer: RetryBuffer,
}


impl<S, R> Acquisition<S, R>
where
    S: MessageSource,
    R: RecordSink,
{

    /// # Argumentos
    /// * `source`: Fuente bloqueante de mensajes (puerto serie en producción).
    /// * `sink`: Destino de subida de registros (Postgres en producción).
    /// * `config`: Documento de configuración ya validado.
    pub fn new(source: S,
               sink: R,
               config: SensorConfig) -> Self {

        Self {
            source,
            sink,
            config,
            buffer: RetryBuffer::new(),
        }
    }

    /// Ejecuta el bucle hasta su condición terminal.
    ///
    /// # Retorno
    /// * `Ok(())`: El buffer superó `max_retries`; cierre deliberado y logueado.
    /// * `Err(AcquisitionError)`: Fallo fatal de la fuente o un registro que no
    ///   cubre las columnas configuradas. Los fallos de subida no terminan el
    ///   bucle: el registro queda en el buffer y se reintenta.
    pub async fn run(&mut self) -> Result<(), AcquisitionError> {

        info!("Info: bucle de adquisición iniciado sobre {}", self.config.port_device);

        let qualified_table = self.config.destination.qualified_table();
        let mut state = LoopState::Sampling;

        loop {
            match state {
                LoopState::Sampling => {
                    if self.buffer.exceeds_limit(self.config.max_retries) {
                        error!("Error: proceso terminado por máximo de fallos de subida.");
                        state = LoopState::Terminated;
                        continue;
                    }

                    let sample = read_sample(&mut self.source, &self.config)?;
                    let record = build_record(&sample, &self.config);
                    self.buffer.push(record);

                    state = LoopState::Draining;
                }
                LoopState::Draining => {
                    while let Some(record) = self.buffer.pop() {
                        let row = record.as_row(&self.config.columns)?;

                        match self.sink.upload(&qualified_table, row).await {
                            Ok(()) => {
                                info!("Info: registro subido: {:?}", record);
                            }
                            Err(e) => {
                                self.buffer.push(record);
                                error!("Error: fallo de subida, se reintenta en el próximo ciclo. {}", e);
                                break;
                            }
                        }
                    }

                    state = LoopState::Sampling;
                }
                LoopState::Terminated => {
                    return Ok(());
                }
            }
        }
    }
}


/// Lee una muestra completa: `period` mensajes de `message_length` bytes.
fn read_sample<S: MessageSource>(source: &mut S,
                                 config: &SensorConfig) -> std::io::Result<Sample> {

    let mut sample = Vec::with_capacity(config.period);
    for _ in 0..config.period {
        sample.push(source.read_message(config.message_length)?);
    }

    Ok(sample)
}


#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::{Cell, RefCell};
    use std::collections::VecDeque;
    use crate::record::domain::FieldValue;
    use crate::sensor::domain::Message;

    const TEST_YAML: &str = r#"
location: "patio"
port_device: "/dev/ttyUSB0"
byte_order: little
message_length: 10
period: 3
max_retries: 5
sensor_id:
  start: 6
  length: 2
measurements:
  pm25:
    start: 2
    length: 2
    scale: 0.1
columns: [location, sensor_id, datetime, pm25]
destination:
  owner: "acme"
  name: "air_quality"
  table_name: "aq_readings"
"#;

    fn config() -> SensorConfig {
        SensorConfig::from_yaml(TEST_YAML).unwrap()
    }

    fn message(pm25_raw: u16) -> Message {
        let mut data = vec![0u8; 10];
        data[2..4].copy_from_slice(&pm25_raw.to_le_bytes());
        data[6..8].copy_from_slice(&7u16.to_le_bytes());
        data
    }

    /// Fuente en memoria; devuelve error cuando se queda sin mensajes.
    struct MockSource {
        messages: VecDeque<Message>,
        reads: usize,
    }

    impl MockSource {
        fn new(messages: Vec<Message>) -> Self {
            Self { messages: messages.into(), reads: 0 }
        }

        fn empty() -> Self {
            Self::new(Vec::new())
        }
    }

    impl MessageSource for MockSource {
        fn read_message(&mut self, _length: usize) -> std::io::Result<Message> {
            self.reads += 1;
            self.messages.pop_front().ok_or_else(|| {
                std::io::Error::new(std::io::ErrorKind::TimedOut, "sin datos")
            })
        }
    }

    /// Destino en memoria que falla las primeras `failures` subidas y
    /// registra el resultado de cada intento.
    struct MockSink {
        failures: Cell<usize>,
        outcomes: RefCell<Vec<bool>>,
    }

    impl MockSink {
        fn failing_first(failures: usize) -> Self {
            Self { failures: Cell::new(failures), outcomes: RefCell::new(Vec::new()) }
        }

        fn always_failing() -> Self {
            Self::failing_first(usize::MAX)
        }
    }

    impl RecordSink for MockSink {
        async fn upload(&self,
                        _qualified_table: &str,
                        _row: Vec<FieldValue>) -> Result<(), sqlx::Error> {
            if self.failures.get() > 0 {
                self.failures.set(self.failures.get() - 1);
                self.outcomes.borrow_mut().push(false);
                Err(sqlx::Error::PoolTimedOut)
            } else {
                self.outcomes.borrow_mut().push(true);
                Ok(())
            }
        }
    }

    fn pm25_of(record: &crate::record::domain::Record) -> f64 {
        match record.get("pm25") {
            Some(FieldValue::Float(v)) => *v,
            other => panic!("se esperaba Float en pm25, hubo {:?}", other),
        }
    }

    #[tokio::test]
    async fn terminates_without_reading_when_buffer_exceeds_limit() {
        let mut config = config();
        config.max_retries = 1;

        let mut acquisition = Acquisition::new(MockSource::empty(), MockSink::always_failing(), config);
        for _ in 0..2 {
            acquisition.buffer.push(crate::record::domain::Record::new());
        }

        let result = acquisition.run().await;

        assert!(result.is_ok());
        assert_eq!(acquisition.source.reads, 0);
        assert!(acquisition.sink.outcomes.borrow().is_empty());
    }

    #[tokio::test]
    async fn failed_records_are_kept_in_lifo_replay_order() {
        // Dos ciclos completos contra un destino que siempre falla; el tercer
        // ciclo corta por fuente agotada antes de llegar al límite del buffer.
        let mut messages = Vec::new();
        for raw in [100u16, 100, 100, 200, 200, 200] {
            messages.push(message(raw));
        }

        let mut acquisition = Acquisition::new(
            MockSource::new(messages),
            MockSink::always_failing(),
            config(),
        );

        let result = acquisition.run().await;

        assert!(matches!(result, Err(AcquisitionError::Source(_))));
        assert_eq!(acquisition.buffer.len(), 2);

        // El fallo más reciente se reintenta primero.
        let first = acquisition.buffer.pop().unwrap();
        let second = acquisition.buffer.pop().unwrap();
        assert!((pm25_of(&first) - 20.0).abs() < f64::EPSILON);
        assert!((pm25_of(&second) - 10.0).abs() < f64::EPSILON);

        // Un solo intento de subida por ciclo: no se gira sobre el mismo registro.
        assert_eq!(*acquisition.sink.outcomes.borrow(), vec![false, false]);
    }

    #[tokio::test]
    async fn drains_backlog_after_transient_failures() {
        // El destino falla dos veces y después se recupera: el tercer ciclo
        // drena el backlog completo y el buffer termina vacío.
        let mut messages = Vec::new();
        for raw in [100u16, 100, 100, 200, 200, 200, 300, 300, 300] {
            messages.push(message(raw));
        }

        let mut acquisition = Acquisition::new(
            MockSource::new(messages),
            MockSink::failing_first(2),
            config(),
        );

        let result = acquisition.run().await;

        // La corrida termina cuando la fuente se agota en el cuarto ciclo.
        assert!(matches!(result, Err(AcquisitionError::Source(_))));
        assert!(acquisition.buffer.is_empty());
        assert_eq!(*acquisition.sink.outcomes.borrow(), vec![false, false, true, true, true]);
        assert_eq!(acquisition.source.reads, 10);
    }

    #[tokio::test]
    async fn successful_cycle_uploads_one_record_and_empties_buffer() {
        let messages = vec![message(100), message(200), message(300)];

        let mut acquisition = Acquisition::new(
            MockSource::new(messages),
            MockSink::failing_first(0),
            config(),
        );

        let result = acquisition.run().await;

        assert!(matches!(result, Err(AcquisitionError::Source(_))));
        assert!(acquisition.buffer.is_empty());
        assert_eq!(*acquisition.sink.outcomes.borrow(), vec![true]);
    }
}
