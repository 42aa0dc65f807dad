//! Bootstrap DC address table, used by decoders whose source format stores
//! no endpoint of its own.

pub(crate) const DC_PORT: u16 = 443;

pub(crate) fn dc_address(dc_id: i32, test_mode: bool) -> Option<&'static str> {
    if test_mode {
        match dc_id {
            1 => Some("149.154.175.10"),
            2 => Some("149.154.167.40"),
            3 => Some("149.154.175.117"),
            _ => None,
        }
    } else {
        match dc_id {
            1 => Some("149.154.175.53"),
            2 => Some("149.154.167.51"),
            3 => Some("149.154.175.100"),
            4 => Some("149.154.167.91"),
            5 => Some("91.108.56.130"),
            _ => None,
        }
    }
}
