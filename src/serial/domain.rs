//! Fuente de mensajes sobre un puerto serie USB.


use std::io::Read;
use std::time::Duration;
use serialport::SerialPort;
use crate::acquisition::domain::MessageSource;
use crate::sensor::domain::Message;


/// Baudios del SDS011 y de la familia de sensores de partículas soportada.
const BAUD_RATE: u32 = 9600;


pub struct SerialSource {
    port: Box<dyn SerialPort>,
}


impl SerialSource {

    /// Abre el puerto serie del sensor con el timeout de lectura configurado.
    ///
    /// Un sensor desconectado hace expirar el timeout y la lectura devuelve
    /// error, en lugar de bloquear el bucle para siempre.
    pub fn open(device: &str, timeout: Duration) -> Result<Self, serialport::Error> {
        let port = serialport::new(device, BAUD_RATE)
            .timeout(timeout)
            .open()?;

        Ok(Self { port })
    }
}


impl MessageSource for SerialSource {

    /// Lectura bloqueante de exactamente `length` bytes.
    fn read_message(&mut self, length: usize) -> std::io::Result<Message> {
        let mut message = vec![0u8; length];
        self.port.read_exact(&mut message)?;
        Ok(message)
    }
}
