use chrono::NaiveDate;

const BASE_YEAR: i32 = 1981;

/// Decodes the fileserver's packed date (little-endian u16 as read off the wire).
///
/// Low byte: bits 0-4 day, bits 5-7 high bits of the year offset.
/// High byte: bits 0-3 month, bits 4-7 low bits of the year offset.
pub fn decode_fs_date(date: u16) -> Option<NaiveDate> {
    let [lo, hi] = date.to_le_bytes();
    let day = u32::from(lo & 0x1F);
    let month = u32::from(hi & 0x0F);
    let year_offset = i32::from((hi >> 4) | ((lo & 0xE0) >> 1));
    NaiveDate::from_ymd_opt(BASE_YEAR + year_offset, month, day)
}

pub fn encode_fs_date(date: NaiveDate) -> Option<u16> {
    use chrono::Datelike;
    let year_offset = date.year() - BASE_YEAR;
    if !(0..128).contains(&year_offset) {
        return None;
    }
    let year_offset = year_offset as u8;
    let lo = (date.day() as u8) | ((year_offset & 0x70) << 1);
    let hi = (date.month() as u8) | ((year_offset & 0x0F) << 4);
    Some(u16::from_le_bytes([lo, hi]))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_fs_date() {
        // 25 Dec 1987: offset 6
        let date = u16::from_le_bytes([25, 0x6C]);
        assert_eq!(NaiveDate::from_ymd_opt(1987, 12, 25), decode_fs_date(date));
    }

    #[test]
    fn test_decode_extended_year() {
        // offset 42 = 0b010_1010 -> high bits 0b010 in lo[5..7], low nibble 0b1010 in hi[4..7]
        let date = u16::from_le_bytes([3 | (0b010 << 5), 0xA7]);
        assert_eq!(NaiveDate::from_ymd_opt(2023, 7, 3), decode_fs_date(date));
    }

    #[test]
    fn test_unset_date() {
        assert_eq!(None, decode_fs_date(0));
    }

    #[test]
    fn test_encode_matches_decode() {
        let date = NaiveDate::from_ymd_opt(2024, 2, 29).unwrap();
        assert_eq!(Some(date), encode_fs_date(date).and_then(decode_fs_date));
        assert_eq!(None, encode_fs_date(NaiveDate::from_ymd_opt(1970, 1, 1).unwrap()));
    }
}
