//! Chunk tags of every tile file kind.

use crate::io::fourcc::fourcc;

// Shared
pub const MVER: u32 = fourcc(b"MVER");
pub const MCNK: u32 = fourcc(b"MCNK");

// Root
pub const MHDR: u32 = fourcc(b"MHDR");
pub const MFBO: u32 = fourcc(b"MFBO");
pub const MH2O: u32 = fourcc(b"MH2O");
pub const MBMH: u32 = fourcc(b"MBMH");
pub const MBBB: u32 = fourcc(b"MBBB");
pub const MBNV: u32 = fourcc(b"MBNV");
pub const MBMI: u32 = fourcc(b"MBMI");

// Root cell
pub const MCVT: u32 = fourcc(b"MCVT");
pub const MCNR: u32 = fourcc(b"MCNR");
pub const MCCV: u32 = fourcc(b"MCCV");
pub const MCLV: u32 = fourcc(b"MCLV");
pub const MCLQ: u32 = fourcc(b"MCLQ");
pub const MCSE: u32 = fourcc(b"MCSE");
pub const MCDD: u32 = fourcc(b"MCDD");
pub const MCBB: u32 = fourcc(b"MCBB");

// Texture
pub const MTEX: u32 = fourcc(b"MTEX");
pub const MDID: u32 = fourcc(b"MDID");
pub const MHID: u32 = fourcc(b"MHID");
pub const MTXF: u32 = fourcc(b"MTXF");
pub const MTXP: u32 = fourcc(b"MTXP");
pub const MAMP: u32 = fourcc(b"MAMP");
pub const MTCG: u32 = fourcc(b"MTCG");

// Texture cell
pub const MCLY: u32 = fourcc(b"MCLY");
pub const MCAL: u32 = fourcc(b"MCAL");
pub const MCSH: u32 = fourcc(b"MCSH");
pub const MCMT: u32 = fourcc(b"MCMT");

// Object
pub const MDDF: u32 = fourcc(b"MDDF");
pub const MODF: u32 = fourcc(b"MODF");
pub const MMDX: u32 = fourcc(b"MMDX");
pub const MMID: u32 = fourcc(b"MMID");
pub const MWMO: u32 = fourcc(b"MWMO");
pub const MWID: u32 = fourcc(b"MWID");
pub const MLMB: u32 = fourcc(b"MLMB");
pub const MWDR: u32 = fourcc(b"MWDR");
pub const MWDS: u32 = fourcc(b"MWDS");
pub const MLMD: u32 = fourcc(b"MLMD");
pub const MLMX: u32 = fourcc(b"MLMX");
pub const MLDD: u32 = fourcc(b"MLDD");
pub const MLDX: u32 = fourcc(b"MLDX");
pub const MLDL: u32 = fourcc(b"MLDL");
pub const MLFD: u32 = fourcc(b"MLFD");
pub const MLDB: u32 = fourcc(b"MLDB");

// Object cell
pub const MCRD: u32 = fourcc(b"MCRD");
pub const MCRW: u32 = fourcc(b"MCRW");

#[test]
fn on_disk_order() {
	assert_eq!(MVER.to_le_bytes(), *b"REVM");
	assert_eq!(&MCNK.to_be_bytes(), b"MCNK");
}
