use crate::{
    error::{Error, Result},
    registers::RegulatorRegister,
    scaling::ScalingFactors,
};
use embedded_io::Error as _;

/// Modbus RTU function 0x03 response: unit id + function + byte count + 2 data bytes + CRC.
const READ_SINGLE_RESPONSE_LEN: usize = 7;
/// Modbus RTU function 0x06 response echoes the 8 byte request.
const WRITE_SINGLE_RESPONSE_LEN: usize = 8;

/// Register driver for the regulation module.
///
/// You can create a Regulator using any interface which implements [embedded_io::Read],
/// [embedded_io::ReadReady] & [embedded_io::Write].
///
/// For its methods, "set" means to write a configuration and "get" means to read it back,
/// where as "read" means to get a measured value.
pub struct Regulator<S: embedded_io::Read + embedded_io::ReadReady + embedded_io::Write> {
    interface: S,
    /// Default for the module is 0x01.
    unit_id: u8,
    scaling: ScalingFactors,
}

impl<S: embedded_io::Read + embedded_io::ReadReady + embedded_io::Write> Regulator<S> {
    /// Create a new Regulator with the given interface, unit ID and scaling.
    pub fn new(interface: S, unit_id: u8, scaling: ScalingFactors) -> Self {
        Self {
            interface,
            unit_id,
            scaling,
        }
    }

    /// Return the measured output voltage in millivolts.
    pub fn read_output_voltage_mv(&mut self) -> Result<u32, S::Error> {
        let raw = self.read_modbus_single(RegulatorRegister::VOut)?;
        Ok(self.scaling.raw_to_voltage_mv(raw))
    }

    /// Return the measured output current in milliamps.
    pub fn read_current_ma(&mut self) -> Result<u32, S::Error> {
        let raw = self.read_modbus_single(RegulatorRegister::IOut)?;
        Ok(self.scaling.raw_to_current_ma(raw))
    }

    /// Set the output target voltage. Value supplied in millivolts.
    pub fn set_output_voltage_mv(&mut self, voltage_mv: u32) -> Result<(), S::Error> {
        let raw = self
            .scaling
            .voltage_mv_to_raw(voltage_mv)
            .ok_or(Error::InvalidRange)?;
        self.write_modbus_single(RegulatorRegister::VSet, raw)
    }

    /// Write to a single register.
    ///
    /// The module acknowledges by echoing the request frame.
    pub fn write_modbus_single(
        &mut self,
        register: impl Into<u16>,
        data: impl Into<u16>,
    ) -> Result<(), S::Error> {
        let mut request: Vec<u8> = Vec::new();
        let mut req = rmodbus::client::ModbusRequest::new(self.unit_id, rmodbus::ModbusProto::Rtu);
        req.generate_set_holding(register.into(), data.into(), &mut request)?;

        let response = self.transact(&request, WRITE_SINGLE_RESPONSE_LEN)?;
        if request != response {
            Err(Error::InvalidResponse)
        } else {
            Ok(())
        }
    }

    /// Read a single register.
    pub fn read_modbus_single(&mut self, register: impl Into<u16>) -> Result<u16, S::Error> {
        let mut request: Vec<u8> = Vec::new();
        let mut req = rmodbus::client::ModbusRequest::new(self.unit_id, rmodbus::ModbusProto::Rtu);
        req.generate_get_holdings(register.into(), 1, &mut request)?;

        let response = self.transact(&request, READ_SINGLE_RESPONSE_LEN)?;

        // CRC, unit id and function code are checked by rmodbus.
        let mut values: Vec<u16> = Vec::new();
        req.parse_u16(&response, &mut values)
            .map_err(|_| Error::InvalidResponse)?;

        values.first().copied().ok_or(Error::InvalidResponse)
    }

    /// Send a request frame and collect the response.
    ///
    /// Reads until `expected_len` bytes have arrived, or until the port times out with a partial
    /// frame, which is then left for the caller to reject.
    fn transact(&mut self, request: &[u8], expected_len: usize) -> Result<Vec<u8>, S::Error> {
        self.discard_stale_input()?;
        self.interface
            .write_all(request)
            .map_err(Error::SerialError)?;

        let mut response: Vec<u8> = Vec::with_capacity(expected_len);
        let mut chunk = [0u8; 8];
        while response.len() < expected_len {
            match self.interface.read(&mut chunk) {
                Ok(0) if response.is_empty() => return Err(Error::InvalidResponse),
                Ok(0) => break,
                Ok(bytes_read) => response.extend_from_slice(&chunk[..bytes_read]),
                Err(e) => {
                    // A timeout after some data means the frame is as complete as it will get.
                    if matches!(
                        e.kind(),
                        embedded_io::ErrorKind::Other | embedded_io::ErrorKind::TimedOut
                    ) && !response.is_empty()
                    {
                        break;
                    }
                    return Err(Error::SerialError(e));
                }
            }
        }
        Ok(response)
    }

    /// Drop whatever is already waiting on the port, such as a reply that arrived after an
    /// earlier request timed out. A read response does not name its register.
    fn discard_stale_input(&mut self) -> Result<(), S::Error> {
        let mut chunk = [0u8; 8];
        let mut discarded = 0;
        while self.interface.read_ready().map_err(Error::SerialError)? {
            match self.interface.read(&mut chunk) {
                Ok(0) => break,
                Ok(bytes_read) => discarded += bytes_read,
                Err(e) => return Err(Error::SerialError(e)),
            }
        }
        if discarded > 0 {
            log::debug!("Discarded {} stale bytes before request", discarded);
        }
        Ok(())
    }

    /// Access the underlying interface.
    #[cfg(test)]
    pub(crate) fn interface(&self) -> &S {
        &self.interface
    }
}
