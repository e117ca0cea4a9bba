use mmdb_reader::{OpenMode, OpenOptions};

/// Map CLI flags onto open options
pub fn open_options(memory: bool, max_depth: Option<usize>) -> OpenOptions {
    let mode = if memory {
        OpenMode::Memory
    } else {
        OpenMode::Mmap
    };
    let options = OpenOptions::new().mode(mode);
    match max_depth {
        Some(depth) => options.max_depth(depth),
        None => options,
    }
}

/// Format IP and prefix length as the CIDR of the matched network
pub fn format_cidr(ip_str: &str, prefix_len: u8) -> String {
    use std::net::IpAddr;

    match ip_str.parse::<IpAddr>() {
        Ok(IpAddr::V4(ipv4)) => {
            let prefix_len = prefix_len.min(32);
            let mask = if prefix_len == 0 {
                0u32
            } else {
                !0u32 << (32 - prefix_len)
            };
            let network = std::net::Ipv4Addr::from(u32::from(ipv4) & mask);
            format!("{}/{}", network, prefix_len)
        }
        Ok(IpAddr::V6(ipv6)) => {
            let prefix_len = prefix_len.min(128);
            let mask = if prefix_len == 0 {
                0u128
            } else {
                !0u128 << (128 - prefix_len)
            };
            let network = std::net::Ipv6Addr::from(u128::from(ipv6) & mask);
            format!("{}/{}", network, prefix_len)
        }
        Err(_) => format!("{}/{}", ip_str, prefix_len),
    }
}

/// Last second of 9999-12-31, the largest time a four-digit year can show
const MAX_RENDERED_TIMESTAMP: u64 = 253_402_300_799;

/// Render a Unix timestamp as "YYYY-MM-DD HH:MM:SS UTC"
pub fn format_unix_timestamp(timestamp: u64) -> String {
    if timestamp > MAX_RENDERED_TIMESTAMP {
        return format!("Invalid timestamp: {}", timestamp);
    }

    let days = timestamp / 86400;
    let remaining = timestamp % 86400;
    let (year, month, day) = days_to_ymd(days);

    format!(
        "{:04}-{:02}-{:02} {:02}:{:02}:{:02} UTC",
        year,
        month,
        day,
        remaining / 3600,
        (remaining % 3600) / 60,
        remaining % 60
    )
}

// Convert days since Unix epoch to year/month/day
fn days_to_ymd(days: u64) -> (u64, u64, u64) {
    let mut year = 1970;
    let mut remaining_days = days;

    loop {
        let days_in_year = if is_leap_year(year) { 366 } else { 365 };
        if remaining_days < days_in_year {
            break;
        }
        remaining_days -= days_in_year;
        year += 1;
    }

    let month_lengths = [
        31,
        if is_leap_year(year) { 29 } else { 28 },
        31,
        30,
        31,
        30,
        31,
        31,
        30,
        31,
        30,
        31,
    ];

    let mut month = 1;
    for len in month_lengths {
        if remaining_days < len {
            break;
        }
        remaining_days -= len;
        month += 1;
    }

    (year, month, remaining_days + 1)
}

fn is_leap_year(year: u64) -> bool {
    (year % 4 == 0 && year % 100 != 0) || year % 400 == 0
}
