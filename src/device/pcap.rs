//! 抓包缓冲区编码（legacy pcap）

use std::io::{self, Write};

use crate::sim::SimTime;

pub const PCAP_MAGIC: u32 = 0xa1b2_c3d4;
pub const LINKTYPE_ETHERNET: u32 = 1;
const SNAPLEN: u32 = 65_535;

fn write_global_header(w: &mut impl Write) -> io::Result<()> {
    w.write_all(&PCAP_MAGIC.to_le_bytes())?;
    w.write_all(&2u16.to_le_bytes())?;
    w.write_all(&4u16.to_le_bytes())?;
    w.write_all(&0i32.to_le_bytes())?;
    w.write_all(&0u32.to_le_bytes())?;
    w.write_all(&SNAPLEN.to_le_bytes())?;
    w.write_all(&LINKTYPE_ETHERNET.to_le_bytes())?;
    Ok(())
}

fn write_record(w: &mut impl Write, at: SimTime, data: &[u8]) -> io::Result<()> {
    let (ts_sec, ts_usec) = at.to_pcap_ts();
    let len = data.len() as u32;
    w.write_all(&ts_sec.to_le_bytes())?;
    w.write_all(&ts_usec.to_le_bytes())?;
    w.write_all(&len.to_le_bytes())?;
    w.write_all(&len.to_le_bytes())?;
    w.write_all(data)?;
    Ok(())
}

/// 把抓到的帧按到达顺序写成 pcap。
pub fn write_capture<'a>(
    w: &mut impl Write,
    frames: impl IntoIterator<Item = (SimTime, &'a [u8])>,
) -> io::Result<()> {
    write_global_header(w)?;
    for (at, data) in frames {
        write_record(w, at, data)?;
    }
    Ok(())
}
