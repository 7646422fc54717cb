//! State queries for monitors.

use crate::io::IoDispatcher;
use crate::map::ZonePolicy;
use crate::memory::Mega65Memory;
use crate::slot::{Handler, SlotId};
use emu_core::{Observable, Value};

fn parse_address(text: &str) -> Option<u32> {
    if let Some(hex) = text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")) {
        u32::from_str_radix(hex, 16).ok()
    } else if let Some(hex) = text.strip_prefix('$') {
        u32::from_str_radix(hex, 16).ok()
    } else {
        text.parse().ok()
    }
}

fn handler_name(handler: Handler) -> &'static str {
    match handler {
        Handler::ZeroPage => "zero-page",
        Handler::MainRam => "ram",
        Handler::SharedColour => "shared-colour",
        Handler::ColourRam => "colour",
        Handler::SlowRam => "slow-ram",
        Handler::SlowDevice => "slow-device",
        Handler::CharWom => "char-wom",
        Handler::Io => "io",
        Handler::LegacyIo => "legacy-io",
        Handler::DiskBuffer => "disk-buffer",
        Handler::I2c => "i2c",
        Handler::Ethernet => "ethernet",
        Handler::HypervisorRam => "hypervisor-ram",
        Handler::Dummy => "dummy",
        Handler::Unmapped => "unmapped",
    }
}

fn zone_name(policy: ZonePolicy) -> String {
    match policy {
        ZonePolicy::Linear(base) => format!("map ${base:07X}"),
        ZonePolicy::Bank(policy) => format!("{policy:?}"),
    }
}

impl<I: IoDispatcher> Observable for Mega65Memory<I> {
    fn query(&self, path: &str) -> Option<Value> {
        if let Some(rest) = path.strip_prefix("port.") {
            match rest {
                "ddr" => Some(self.cpu_port(0).into()),
                "data" => Some(self.cpu_port(1).into()),
                "code" => Some(self.bank.code().into()),
                _ => None,
            }
        } else if let Some(rest) = path.strip_prefix("map.") {
            let config = self.map_config();
            match rest {
                "megabyte_low" => Some(config.megabyte_low.into()),
                "offset_low" => Some(config.offset_low.into()),
                "megabyte_high" => Some(config.megabyte_high.into()),
                "offset_high" => Some(config.offset_high.into()),
                "block_mask" => Some(config.block_mask.into()),
                "inhibit" => Some(self.interrupts_inhibited().into()),
                _ => None,
            }
        } else if let Some(rest) = path.strip_prefix("slot.") {
            let page = u8::try_from(parse_address(rest)?).ok()?;
            let text = match self.slots.get(SlotId::Page(page), u32::from(page) << 8) {
                Some(resolved) => format!(
                    "{} ${:07X} / {} ${:07X}",
                    handler_name(resolved.read.handler),
                    resolved.read.base,
                    handler_name(resolved.write.handler),
                    resolved.write.base
                ),
                None => "unresolved".to_string(),
            };
            Some(text.into())
        } else if let Some(rest) = path.strip_prefix("cpu.") {
            let addr = u16::try_from(parse_address(rest)?).ok()?;
            Some(self.cpu_to_linear(addr).into())
        } else if let Some(rest) = path.strip_prefix("linear.") {
            self.peek_linear(parse_address(rest)?).map(Value::U8)
        } else {
            match path {
                "rom_select" => Some(self.rom_select().into()),
                "privileged" => Some(self.is_privileged().into()),
                "rom_protect" => Some(self.rom_protect().into()),
                "io_layout" => Some(format!("{:?}", self.io_layout()).into()),
                "zones" => Some(Value::Array(
                    crate::map::effective_zones(self.map.config(), self.bank.policies())
                        .into_iter()
                        .map(|zone| zone_name(zone).into())
                        .collect(),
                )),
                "resolves" => Some(Value::U32(
                    u32::try_from(self.resolve_count()).unwrap_or(u32::MAX),
                )),
                "pc" => Some(self.pc().into()),
                _ => None,
            }
        }
    }

    fn query_paths(&self) -> &'static [&'static str] {
        &[
            "port.ddr",
            "port.data",
            "port.code",
            "rom_select",
            "privileged",
            "rom_protect",
            "io_layout",
            "map.megabyte_low",
            "map.offset_low",
            "map.megabyte_high",
            "map.offset_high",
            "map.block_mask",
            "map.inhibit",
            "zones",
            "resolves",
            "pc",
            "slot.<page>",
            "cpu.<address>",
            "linear.<address>",
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_memory() -> Mega65Memory {
        Mega65Memory::with_defaults().expect("default config")
    }

    #[test]
    fn port_and_map_paths() {
        let mut mem = make_memory();
        mem.apply_map(0x45, 0x23, 0, 0);
        assert_eq!(mem.query("port.code"), Some(Value::U8(7)));
        assert_eq!(mem.query("map.offset_low"), Some(Value::U32(0x3_4500)));
        assert_eq!(mem.query("map.inhibit"), Some(Value::Bool(true)));
        assert_eq!(mem.query("nonsense"), None);
    }

    #[test]
    fn slot_path_shows_resolution() {
        let mut mem = make_memory();
        assert_eq!(
            mem.query("slot.$A0"),
            Some(Value::String("unresolved".into()))
        );
        mem.cpu_read(0xA000);
        assert_eq!(
            mem.query("slot.$A0"),
            Some(Value::String("ram $002A000 / ram $000A000".into()))
        );
    }

    #[test]
    fn address_paths() {
        let mut mem = make_memory();
        mem.cpu_write(0x0400, 0x01);
        assert_eq!(mem.query("linear.0x400"), Some(Value::U8(0x01)));
        assert_eq!(mem.query("cpu.$E000"), Some(Value::U32(0x2_E000)));
        assert_eq!(mem.query("linear.$FFD0000"), None);
    }

    #[test]
    fn zones_list_all_sixteen() {
        let mem = make_memory();
        let Some(Value::Array(zones)) = mem.query("zones") else {
            panic!("zones should be an array");
        };
        assert_eq!(zones.len(), 16);
        assert_eq!(zones[0xD], Value::String("LegacyIo".into()));
    }
}
