//! Display rendering for raw record fields
//!
//! Two renderers, both total over their inputs:
//! - [`TimeRenderer`] turns a little-endian tick count into elapsed seconds
//!   since power-on. The tick rate is looked up per field name.
//! - [`ChannelNames`] turns a channel bitmask into symbolic names, falling
//!   back to a binary literal for bits that have no name.

use byteorder::{ByteOrder, LittleEndian};
use std::collections::BTreeMap;

/// ADM1266 timestamps count 1/65536 s
pub const TIMESTAMP_TICKS_PER_SECOND: u64 = 65536;

/// Field name → ticks-per-second dispatch for elapsed-time fields
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimeRenderer {
    units: BTreeMap<String, u64>,
}

impl Default for TimeRenderer {
    fn default() -> Self {
        let mut units = BTreeMap::new();
        units.insert("timestamp".to_string(), TIMESTAMP_TICKS_PER_SECOND);
        Self { units }
    }
}

impl TimeRenderer {
    /// Builder method: register or override the tick rate of `field`
    ///
    /// A rate of zero removes the field.
    pub fn with_unit(mut self, field: impl Into<String>, ticks_per_second: u64) -> Self {
        let field = field.into();
        if ticks_per_second == 0 {
            self.units.remove(&field);
        } else {
            self.units.insert(field, ticks_per_second);
        }
        self
    }

    /// Render `raw` (up to 8 little-endian bytes) as time since power-on
    pub fn time_since(&self, field: &str, raw: &[u8]) -> String {
        let ticks = read_ticks(raw);
        match self.units.get(field) {
            Some(&per_second) => {
                let secs = ticks as f64 / per_second as f64;
                format!("{:.3} seconds after power-on", secs)
            }
            None => {
                log::debug!("No time unit for field '{}', rendering raw ticks", field);
                format!("{} ticks after power-on", ticks)
            }
        }
    }
}

/// Tick count from the first 8 bytes of `raw`, zero-extended when shorter
fn read_ticks(raw: &[u8]) -> u64 {
    let len = raw.len().min(8);
    if len == 0 {
        return 0;
    }
    LittleEndian::read_uint(raw, len)
}

/// Render a timestamp field with the default tick rates
pub fn time_since(field: &str, raw: &[u8]) -> String {
    TimeRenderer::default().time_since(field, raw)
}

/// Channel classes recorded in a blackbox entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelClass {
    GpioIn,
    GpioOut,
    PdioIn,
    PdioOut,
    VhOv,
    VhUv,
    VpOv,
    VpUv,
}

impl ChannelClass {
    pub const ALL: [ChannelClass; 8] = [
        ChannelClass::VhOv,
        ChannelClass::VhUv,
        ChannelClass::VpOv,
        ChannelClass::VpUv,
        ChannelClass::GpioIn,
        ChannelClass::GpioOut,
        ChannelClass::PdioIn,
        ChannelClass::PdioOut,
    ];

    /// Parse a field tag such as `"gpio_in"`
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "gpio_in" => Some(ChannelClass::GpioIn),
            "gpio_out" => Some(ChannelClass::GpioOut),
            "pdio_in" => Some(ChannelClass::PdioIn),
            "pdio_out" => Some(ChannelClass::PdioOut),
            "vh_ov" => Some(ChannelClass::VhOv),
            "vh_uv" => Some(ChannelClass::VhUv),
            "vp_ov" => Some(ChannelClass::VpOv),
            "vp_uv" => Some(ChannelClass::VpUv),
            _ => None,
        }
    }

    pub fn tag(&self) -> &'static str {
        match self {
            ChannelClass::GpioIn => "gpio_in",
            ChannelClass::GpioOut => "gpio_out",
            ChannelClass::PdioIn => "pdio_in",
            ChannelClass::PdioOut => "pdio_out",
            ChannelClass::VhOv => "vh_ov",
            ChannelClass::VhUv => "vh_uv",
            ChannelClass::VpOv => "vp_ov",
            ChannelClass::VpUv => "vp_uv",
        }
    }
}

/// GPIO1..3 sit in bits 0..2, GPIO4..9 in bits 8..13
const GPIO_BITS: [(u32, u8); 9] = [
    (0, 1),
    (1, 2),
    (2, 3),
    (8, 4),
    (9, 5),
    (10, 6),
    (11, 7),
    (12, 8),
    (13, 9),
];

const PDIO_COUNT: u32 = 16;
const VH_COUNT: u32 = 4;
const VP_COUNT: u32 = 13;

/// Channel-name renderer with optional per-rail descriptions
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChannelNames {
    vp_rails: BTreeMap<u8, String>,
    vh_rails: BTreeMap<u8, String>,
}

impl ChannelNames {
    /// Rail tables are keyed by 1-based channel number (`6` → VP6)
    pub fn new(vp_rails: BTreeMap<u8, String>, vh_rails: BTreeMap<u8, String>) -> Self {
        Self { vp_rails, vh_rails }
    }

    /// Render `bits` of the class named by `tag`
    ///
    /// Known classes render as `"GPIO1, GPIO3"`; bits with no name are appended
    /// as a single binary literal. Unknown tags render the whole mask as a
    /// binary literal.
    pub fn channel_names(&self, tag: &str, bits: u64) -> String {
        match ChannelClass::from_tag(tag) {
            Some(class) => self.render(class, bits),
            None => format!("{:#b}", bits),
        }
    }

    /// Render `bits` of a known channel class
    pub fn render(&self, class: ChannelClass, bits: u64) -> String {
        if bits == 0 {
            return "none".to_string();
        }

        let mut names = Vec::new();
        let mut named_mask = 0u64;

        for bit in 0..64u32 {
            if bits & (1 << bit) == 0 {
                continue;
            }
            if let Some(name) = self.bit_name(class, bit) {
                names.push(name);
                named_mask |= 1 << bit;
            }
        }

        let residual = bits & !named_mask;
        if residual != 0 {
            names.push(format!("{:#b}", residual));
        }

        names.join(", ")
    }

    fn bit_name(&self, class: ChannelClass, bit: u32) -> Option<String> {
        match class {
            ChannelClass::GpioIn | ChannelClass::GpioOut => GPIO_BITS
                .iter()
                .find(|(b, _)| *b == bit)
                .map(|(_, n)| format!("GPIO{}", n)),
            ChannelClass::PdioIn | ChannelClass::PdioOut => {
                (bit < PDIO_COUNT).then(|| format!("PDIO{}", bit + 1))
            }
            ChannelClass::VhOv | ChannelClass::VhUv => {
                rail_name("VH", bit, VH_COUNT, &self.vh_rails)
            }
            ChannelClass::VpOv | ChannelClass::VpUv => {
                rail_name("VP", bit, VP_COUNT, &self.vp_rails)
            }
        }
    }
}

/// Name of a supply channel bit
///
/// Bits past `count` are named only when the rail table describes them.
fn rail_name(
    prefix: &str,
    bit: u32,
    count: u32,
    rails: &BTreeMap<u8, String>,
) -> Option<String> {
    let channel = bit + 1;
    let rail = u8::try_from(channel).ok().and_then(|c| rails.get(&c));
    match rail {
        Some(rail) => Some(format!("{}{} ({})", prefix, channel, rail)),
        None if bit < count => Some(format!("{}{}", prefix, channel)),
        None => None,
    }
}

/// Render channel bits with no rail descriptions
pub fn channel_names(tag: &str, bits: u64) -> String {
    ChannelNames::default().channel_names(tag, bits)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_time_since_timestamp() {
        // 0x02EE2E79 ticks
        let raw = [0x79, 0x2e, 0xee, 0x02, 0x00, 0x00, 0x00, 0x00];
        let rendered = time_since("timestamp", &raw);
        assert_eq!(rendered, "750.182 seconds after power-on");
    }

    #[test]
    fn test_time_since_fifty_million_ticks() {
        let rendered = time_since("timestamp", &50_000_000u64.to_le_bytes());
        assert!(rendered.contains("seconds after power-on"));
        assert!(rendered.starts_with("762.939"));
    }

    #[test]
    fn test_time_since_short_and_empty_buffers() {
        assert_eq!(time_since("timestamp", &[]), "0.000 seconds after power-on");
        // 0x010000 ticks = 1 second
        assert_eq!(
            time_since("timestamp", &[0x00, 0x00, 0x01]),
            "1.000 seconds after power-on"
        );
        // Bytes past the eighth are ignored
        let mut long = 65536u64.to_le_bytes().to_vec();
        long.extend_from_slice(&[0xff, 0xff]);
        assert_eq!(time_since("timestamp", &long), "1.000 seconds after power-on");
    }

    #[test]
    fn test_time_units_are_configurable() {
        let renderer = TimeRenderer::default().with_unit("uptime_ms", 1000);
        assert_eq!(
            renderer.time_since("uptime_ms", &2500u64.to_le_bytes()),
            "2.500 seconds after power-on"
        );
        assert_eq!(
            renderer.time_since("unknown", &42u64.to_le_bytes()),
            "42 ticks after power-on"
        );

        let renderer = renderer.with_unit("timestamp", 0);
        assert_eq!(
            renderer.time_since("timestamp", &7u64.to_le_bytes()),
            "7 ticks after power-on"
        );
    }

    #[test]
    fn test_gpio_names_with_residual() {
        // 0x3C1F: GPIO1-3, bits 3-4 unnamed, GPIO6-9
        let rendered = channel_names("gpio_in", 15391);
        assert_eq!(rendered, "GPIO1, GPIO2, GPIO3, GPIO6, GPIO7, GPIO8, GPIO9, 0b11000");
    }

    #[test]
    fn test_pdio_names() {
        assert_eq!(channel_names("pdio_in", 0x8001), "PDIO1, PDIO16");
        assert_eq!(channel_names("pdio_out", 0x1_0000), "0b10000000000000000");
    }

    #[test]
    fn test_unknown_tag_falls_back_to_binary() {
        assert_eq!(channel_names("mystery", 5), "0b101");
        assert_eq!(channel_names("mystery", 0), "0b0");
    }

    #[test]
    fn test_zero_mask() {
        assert_eq!(channel_names("vp_ov", 0), "none");
    }

    #[test]
    fn test_rail_descriptions() {
        let mut vp = BTreeMap::new();
        vp.insert(6, "POS0V75_S5".to_string());
        let mut vh = BTreeMap::new();
        vh.insert(1, "POS5V0_S0".to_string());
        let names = ChannelNames::new(vp, vh);

        assert_eq!(names.channel_names("vp_uv", (1 << 5) | 1), "VP1, VP6 (POS0V75_S5)");
        assert_eq!(names.channel_names("vh_ov", 0b10001), "VH1 (POS5V0_S0), 0b10000");
    }

    #[test]
    fn test_described_rail_past_channel_count() {
        let mut vh = BTreeMap::new();
        vh.insert(5, "POS5V0_S0".to_string());
        let names = ChannelNames::new(BTreeMap::new(), vh);

        assert_eq!(names.channel_names("vh_ov", 0b1_0000), "VH5 (POS5V0_S0)");
        assert_eq!(names.channel_names("vh_ov", 0b11_0001), "VH1, VH5 (POS5V0_S0), 0b100000");
        // Without a description the same bit stays unnamed
        assert_eq!(channel_names("vh_ov", 0b1_0000), "0b10000");
    }

    #[test]
    fn test_class_tags_roundtrip() {
        for class in ChannelClass::ALL {
            assert_eq!(ChannelClass::from_tag(class.tag()), Some(class));
        }
    }
}
