//! ELF64 constants and the final header/program-header layout. Constant
//! naming follows the `EI_*`/`ET_*`/`PT_*`/`SHT_*` groups in
//! `examples/other_examples/21d423fb_Noratrieb-elven-forest__elven-parser-src-consts.rs.rs`;
//! this module only keeps the subset that a statically linked, no-section-header
//! executable actually needs, and packs bytes directly instead of deriving
//! `bytemuck::Pod` since nothing here is ever read back through a `&[u8]` cast.

pub const ELFMAG: [u8; 4] = [0x7f, b'E', b'L', b'F'];

pub const ELFCLASS64: u8 = 2;
pub const ELFDATA2LSB: u8 = 1;
pub const EV_CURRENT: u8 = 1;
pub const ELFOSABI_SYSV: u8 = 0;

pub const ET_EXEC: u16 = 2;
pub const EM_X86_64: u16 = 62;

pub const PT_LOAD: u32 = 1;
pub const PF_X: u32 = 1;
pub const PF_W: u32 = 2;
pub const PF_R: u32 = 4;

pub const EHDR_SIZE: u64 = 64;
pub const PHDR_SIZE: u64 = 56;

/// Where the first loadable segment is mapped. Chosen so that, combined with
/// page alignment, `vaddr = file_offset + LOAD_BIAS` holds for every byte in
/// the file — the assembler's intra-file patches (§4.6) never need to know
/// this constant, only the final linker step that picks an entry point does.
pub const LOAD_BIAS: u64 = 0x400000;
pub const PAGE_SIZE: u64 = 0x1000;

/// One `Elf64_Phdr` entry.
pub struct ProgramHeader {
    pub p_type: u32,
    pub p_flags: u32,
    pub p_offset: u64,
    pub p_vaddr: u64,
    pub p_filesz: u64,
    pub p_memsz: u64,
    pub p_align: u64,
}

impl ProgramHeader {
    fn write(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(&self.p_type.to_le_bytes());
        out.extend_from_slice(&self.p_flags.to_le_bytes());
        out.extend_from_slice(&self.p_offset.to_le_bytes());
        out.extend_from_slice(&self.p_vaddr.to_le_bytes());
        out.extend_from_slice(&self.p_vaddr.to_le_bytes()); // p_paddr, unused under Linux
        out.extend_from_slice(&self.p_filesz.to_le_bytes());
        out.extend_from_slice(&self.p_memsz.to_le_bytes());
        out.extend_from_slice(&self.p_align.to_le_bytes());
    }
}

/// Writes the 64-byte ELF header for a static, non-PIE executable with
/// `phnum` program headers immediately following it.
fn write_ehdr(out: &mut Vec<u8>, entry: u64, phnum: u16) {
    out.extend_from_slice(&ELFMAG);
    out.push(ELFCLASS64);
    out.push(ELFDATA2LSB);
    out.push(EV_CURRENT);
    out.push(ELFOSABI_SYSV);
    out.extend_from_slice(&[0u8; 8]); // EI_ABIVERSION + EI_PAD
    out.extend_from_slice(&ET_EXEC.to_le_bytes());
    out.extend_from_slice(&EM_X86_64.to_le_bytes());
    out.extend_from_slice(&(EV_CURRENT as u32).to_le_bytes()); // e_version
    out.extend_from_slice(&entry.to_le_bytes());
    out.extend_from_slice(&EHDR_SIZE.to_le_bytes()); // e_phoff: phdrs right after ehdr
    out.extend_from_slice(&0u64.to_le_bytes()); // e_shoff: no section headers
    out.extend_from_slice(&0u32.to_le_bytes()); // e_flags
    out.extend_from_slice(&(EHDR_SIZE as u16).to_le_bytes());
    out.extend_from_slice(&(PHDR_SIZE as u16).to_le_bytes());
    out.extend_from_slice(&phnum.to_le_bytes());
    out.extend_from_slice(&0u16.to_le_bytes()); // e_shentsize
    out.extend_from_slice(&0u16.to_le_bytes()); // e_shnum
    out.extend_from_slice(&0u16.to_le_bytes()); // e_shstrndx
}

/// A fully laid-out, ready-to-write executable: one R-X segment for
/// code+rodata, one R-W segment for initialized data+bss, no section
/// headers (§4.6 — this backend never produces relocatable objects, only
/// final executables, so a section table buys nothing a loader needs).
pub struct ExecutableLayout {
    pub entry_vaddr: u64,
    pub text_vaddr: u64,
    pub rodata_vaddr: u64,
    pub data_vaddr: u64,
    pub bytes: Vec<u8>,
}

fn align_up(v: u64, align: u64) -> u64 {
    (v + align - 1) & !(align - 1)
}

/// File/virtual offsets for each section, computed from section lengths
/// alone. Exposed separately from `build_executable` so the assembler can
/// resolve `.text`'s rip-relative/call patches against final vaddrs before
/// the file bytes are assembled (`src/backend/mod.rs`).
pub struct Layout {
    pub header_region: u64,
    pub text_off: u64,
    pub rodata_off: u64,
    pub data_off: u64,
    pub text_vaddr: u64,
    pub rodata_vaddr: u64,
    pub data_vaddr: u64,
}

pub fn compute_layout(text_len: usize, rodata_len: usize) -> Layout {
    let phnum = 2u64;
    let header_region = EHDR_SIZE + phnum * PHDR_SIZE;
    let text_off = header_region;
    let rodata_off = text_off + text_len as u64;
    let data_off = align_up(rodata_off + rodata_len as u64, PAGE_SIZE);
    Layout {
        header_region,
        text_off,
        rodata_off,
        data_off,
        text_vaddr: LOAD_BIAS + text_off,
        rodata_vaddr: LOAD_BIAS + rodata_off,
        data_vaddr: LOAD_BIAS + data_off,
    }
}

/// Lays out `text` (code) immediately followed by `rodata` (float/string
/// constants) in one R-X segment, then `data` (initialized globals) page-aligned
/// into a second R-W segment, with `bss_len` zero bytes left unbacked by the
/// file (relying on the loader to zero-fill memory past `p_filesz`).
pub fn build_executable(
    text: &[u8],
    rodata: &[u8],
    data: &[u8],
    bss_len: u64,
    entry_offset_in_text: u64,
) -> ExecutableLayout {
    let layout = compute_layout(text.len(), rodata.len());
    let phnum = 2u16;
    let header_region = layout.header_region;

    let seg1_filesz = layout.rodata_off + rodata.len() as u64 - layout.text_off;
    let data_off = layout.data_off;

    let text_vaddr = layout.text_vaddr;
    let rodata_vaddr = layout.rodata_vaddr;
    let data_vaddr = layout.data_vaddr;
    let entry_vaddr = text_vaddr + entry_offset_in_text;

    let mut out = Vec::new();
    write_ehdr(&mut out, entry_vaddr, phnum);

    ProgramHeader {
        p_type: PT_LOAD,
        p_flags: PF_R | PF_X,
        p_offset: 0,
        p_vaddr: LOAD_BIAS,
        p_filesz: seg1_filesz + header_region,
        p_memsz: seg1_filesz + header_region,
        p_align: PAGE_SIZE,
    }
    .write(&mut out);

    ProgramHeader {
        p_type: PT_LOAD,
        p_flags: PF_R | PF_W,
        p_offset: data_off,
        p_vaddr: data_vaddr,
        p_filesz: data.len() as u64,
        p_memsz: data.len() as u64 + bss_len,
        p_align: PAGE_SIZE,
    }
    .write(&mut out);

    debug_assert_eq!(out.len() as u64, header_region);
    out.extend_from_slice(text);
    out.extend_from_slice(rodata);
    out.resize(data_off as usize, 0);
    out.extend_from_slice(data);

    ExecutableLayout { entry_vaddr, text_vaddr, rodata_vaddr, data_vaddr, bytes: out }
}
