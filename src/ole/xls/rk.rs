//! RK packed numbers
//!
//! An RK value squeezes a number into 32 bits. Bit 0 asks for the result to be
//! divided by 100, bit 1 says the remaining 30 bits are a signed integer
//! rather than the high half of an IEEE-754 double.

use std::fmt;

use crate::ole::xls::error::{XlsError, XlsResult};

const DIV_100: u32 = 0x01;
const INTEGER: u32 = 0x02;

/// A raw RK value as stored in RK and MULRK records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Rk(pub u32);

/// Decoded form of an [`Rk`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RkNumber {
    /// The exact integer, when `is_float` is false
    pub int_value: i64,
    /// The value, when `is_float` is true
    pub float_value: f64,
    pub is_float: bool,
}

impl Rk {
    #[inline]
    pub fn is_integer_encoded(self) -> bool {
        self.0 & INTEGER != 0
    }

    #[inline]
    pub fn is_scaled(self) -> bool {
        self.0 & DIV_100 != 0
    }

    /// Decode into integer or float form.
    ///
    /// Only an integer-encoded value without the divide-by-100 flag stays an
    /// exact integer; every other combination yields a float.
    pub fn as_number(self) -> RkNumber {
        if self.is_integer_encoded() {
            let payload = (self.0 as i32) >> 2;
            if self.is_scaled() {
                RkNumber {
                    int_value: 0,
                    float_value: payload as f64 / 100.0,
                    is_float: true,
                }
            } else {
                RkNumber {
                    int_value: payload as i64,
                    float_value: 0.0,
                    is_float: false,
                }
            }
        } else {
            let mut value = f64::from_bits(((self.0 & 0xFFFF_FFFC) as u64) << 32);
            if self.is_scaled() {
                value /= 100.0;
            }
            RkNumber {
                int_value: 0,
                float_value: value,
                is_float: true,
            }
        }
    }

    /// The value as a float, or [`XlsError::NotAFloat`] for an exact integer.
    pub fn as_float(self) -> XlsResult<f64> {
        let n = self.as_number();
        if n.is_float {
            Ok(n.float_value)
        } else {
            Err(XlsError::NotAFloat)
        }
    }

    /// The numeric value regardless of encoding.
    pub fn as_f64(self) -> f64 {
        let n = self.as_number();
        if n.is_float {
            n.float_value
        } else {
            n.int_value as f64
        }
    }
}

impl fmt::Display for Rk {
    /// Plain decimal text: integers without a fraction, floats in shortest form.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let n = self.as_number();
        if n.is_float {
            write!(f, "{}", n.float_value)
        } else {
            f.write_str(itoa::Buffer::new().format(n.int_value))
        }
    }
}
