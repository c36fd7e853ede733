use std::fs;

use super::*;

struct ImageFile {
    name: String,
    dir: char,
    locked: bool,
    load: u32,
    exec: u32,
    data: Vec<u8>,
}

impl ImageFile {
    fn new(name: &str, load: u32, exec: u32, data: Vec<u8>) -> Self {
        Self {
            name: name.to_string(),
            dir: '$',
            locked: false,
            load,
            exec,
            data,
        }
    }
}

fn pattern(len: usize, seed: u8) -> Vec<u8> {
    (0..len).map(|i| (i as u8).wrapping_mul(7).wrapping_add(seed)).collect()
}

/// Builds a single-sided image with `files` laid out from sector 2 onwards.
fn build_side(title: &str, cycle_bcd: u8, boot: u8, tracks: usize, files: &[ImageFile]) -> Vec<u8> {
    let sectors = tracks * SECTORS_PER_TRACK;
    let mut buf = vec![0u8; sectors * BYTES_PER_SECTOR];

    let title = title.as_bytes();
    let head = title.len().min(8);
    buf[0..head].copy_from_slice(&title[..head]);
    if title.len() > 8 {
        buf[256..256 + title.len() - 8].copy_from_slice(&title[8..]);
    }
    buf[256 + 4] = cycle_bcd;
    buf[256 + 5] = (files.len() as u8) << 3;
    buf[256 + 6] = boot << 4 | ((sectors >> 8) & 0x0F) as u8;
    buf[256 + 7] = (sectors & 0xFF) as u8;

    let mut next_sector = 2usize;
    for (i, file) in files.iter().enumerate() {
        let slot0 = (i + 1) * 8;
        let mut name = [b' '; 7];
        name[..file.name.len()].copy_from_slice(file.name.as_bytes());
        buf[slot0..slot0 + 7].copy_from_slice(&name);
        buf[slot0 + 7] = file.dir as u8 | if file.locked { 0x80 } else { 0 };

        let len = file.data.len() as u32;
        let slot1 = slot0 + 256;
        buf[slot1..slot1 + 2].copy_from_slice(&(file.load as u16).to_le_bytes());
        buf[slot1 + 2..slot1 + 4].copy_from_slice(&(file.exec as u16).to_le_bytes());
        buf[slot1 + 4..slot1 + 6].copy_from_slice(&(len as u16).to_le_bytes());
        buf[slot1 + 6] = (((file.exec >> 16) & 3) << 6 | ((len >> 16) & 3) << 4 | ((file.load >> 16) & 3) << 2 | ((next_sector >> 8) & 3) as u32) as u8;
        buf[slot1 + 7] = (next_sector & 0xFF) as u8;

        let offset = next_sector * BYTES_PER_SECTOR;
        buf[offset..offset + file.data.len()].copy_from_slice(&file.data);
        next_sector += (file.data.len() + BYTES_PER_SECTOR - 1) / BYTES_PER_SECTOR;
    }
    buf
}

const BOOT_TEXT: &[u8] = b"CLS\rCHAIN\"!MENU\"\r";

fn games_ssd() -> Vec<u8> {
    let mut files = vec![
        ImageFile::new("ASTDEL", 0xa00, 0xd22, pattern(9547, 1)),
        ImageFile::new("!BOOT", 0x3FFFF, 0x3FFFF, BOOT_TEXT.to_vec()),
        ImageFile {
            locked: true,
            ..ImageFile::new("!MENU", 0x1900, 0x8023, pattern(700, 2))
        },
        ImageFile {
            dir: 'G',
            ..ImageFile::new("CHUCKIE", 0x1100, 0x1100, pattern(300, 3))
        },
    ];
    const NAMES: [&str; 22] = [
        "GAME04", "GAME05", "GAME06", "GAME07", "GAME08", "GAME09", "GAME10", "GAME11", "GAME12", "GAME13", "GAME14", "GAME15", "GAME16", "GAME17", "GAME18",
        "GAME19", "GAME20", "GAME21", "GAME22", "GAME23", "GAME24", "GAME25",
    ];
    for (i, name) in NAMES.iter().enumerate() {
        files.push(ImageFile::new(name, 0x1900, 0x1900, pattern(200 + i, i as u8)));
    }
    build_side("GAMES.SSD", 0x56, 3, 40, &files)
}

fn sigma_dsd() -> Vec<u8> {
    let mut side0_files = vec![ImageFile::new("C2LOAD", 0x31900, 0x38023, pattern(260, 9))];
    for i in 1..24 {
        side0_files.push(ImageFile::new(&format!("S0F{i:02}"), 0x31900, 0x31900, pattern(100, i as u8)));
    }
    let mut side1_files = vec![ImageFile::new("WC6", 0x37c00, 0x37c00, pattern(1023, 4))];
    for i in 1..7 {
        side1_files.push(ImageFile::new(&format!("S1F{i:02}"), 0x37c00, 0x37c00, pattern(50, i as u8)));
    }
    let side0 = build_side("SIGMA", 0x31, 3, 40, &side0_files);
    let side1 = build_side("", 0x07, 0, 40, &side1_files);

    let track_size = BYTES_PER_SECTOR * SECTORS_PER_TRACK;
    let mut image = Vec::with_capacity(side0.len() * 2);
    for (t0, t1) in side0.chunks(track_size).zip(side1.chunks(track_size)) {
        image.extend_from_slice(t0);
        image.extend_from_slice(t1);
    }
    image
}

#[test]
fn test_parse_single_sided() {
    let side = parse_single_sided_disk_image(&games_ssd()).unwrap();
    assert_eq!("GAMES.SSD", side.title);
    assert_eq!(BootOption::Exec, side.boot_option);
    assert_eq!(56, side.cycle_num);
    assert_eq!(26, side.files().len());

    let first = &side.files()[0];
    assert_eq!("ASTDEL", first.name);
    assert_eq!(9547, first.data.len());
    assert_eq!(pattern(9547, 1), first.data);
    assert!(!first.is_locked);
    assert_eq!(0xa00, first.load_address);
    assert_eq!(0xd22, first.execution_address);
    assert_eq!('$', first.dir);

    assert!(side.files()[2].is_locked);
    assert_eq!('G', side.files()[3].dir);
}

#[test]
fn test_parse_double_sided() {
    let [side0, side1] = parse_double_sided_disk_image(&sigma_dsd()).unwrap();

    assert_eq!("SIGMA", side0.title);
    assert_eq!(BootOption::Exec, side0.boot_option);
    assert_eq!(31, side0.cycle_num);
    assert_eq!(24, side0.files().len());
    assert_eq!("C2LOAD", side0.files()[0].name);
    assert_eq!(260, side0.files()[0].data.len());
    assert_eq!(0x31900, side0.files()[0].load_address);
    assert_eq!(0x38023, side0.files()[0].execution_address);

    assert_eq!("", side1.title);
    assert_eq!(BootOption::None, side1.boot_option);
    assert_eq!(7, side1.cycle_num);
    assert_eq!(7, side1.files().len());
    assert_eq!("WC6", side1.files()[0].name);
    assert_eq!(1023, side1.files()[0].data.len());
    assert_eq!(pattern(1023, 4), side1.files()[0].data);
    assert_eq!(0x37c00, side1.files()[0].load_address);
    assert_eq!(0x37c00, side1.files()[0].execution_address);
}

#[test]
fn test_parse_disk_image() {
    assert_eq!(1, parse_disk_image(&games_ssd(), false).unwrap().len());
    let sides = parse_disk_image(&sigma_dsd(), true).unwrap();
    assert_eq!(2, sides.len());
    assert_eq!(7, sides[1].files().len());
}

#[test]
fn test_extract_single_sided() {
    let side = parse_single_sided_disk_image(&games_ssd()).unwrap();
    let dir = tempfile::tempdir().unwrap();
    side.extract_files(dir.path()).unwrap();

    assert_eq!(BOOT_TEXT, fs::read(dir.path().join("!BOOT")).unwrap().as_slice());
    assert_eq!("!BOOT      0003FFFF 0003FFFF\n", fs::read_to_string(dir.path().join("!BOOT.inf")).unwrap());
    assert!(dir.path().join("G").join("CHUCKIE").exists());
    assert!(dir.path().join("G").join("CHUCKIE.inf").exists());
    assert!(!dir.path().join("CHUCKIE").exists());

    // 25 files and their sidecars plus the G directory
    assert_eq!(25 + 25 + 1, fs::read_dir(dir.path()).unwrap().count());
}

#[test]
fn test_reject_truncated() {
    let err = parse_single_sided_disk_image(&[]).unwrap_err();
    assert_eq!("truncated DFS disk image: expected >= 102400 bytes, got 0 bytes", err.to_string());
}

#[test]
fn test_reject_track_count() {
    let mut buffer = games_ssd();
    buffer[256 + 7] = 255;
    let err = parse_single_sided_disk_image(&buffer).unwrap_err();
    assert_eq!("invalid number of tracks 51.1 reported in catalogue (must be 40 or 80)", err.to_string());
}

#[test]
fn test_reject_boot_option() {
    let mut buffer = games_ssd();
    buffer[256 + 6] |= 0b1111_0000;
    let err = parse_single_sided_disk_image(&buffer).unwrap_err();
    assert!(matches!(err, DfsError::InvalidBootOption(15)));
    assert_eq!("invalid boot option 15 reported in catalogue", err.to_string());
}

#[test]
fn test_reject_start_sector() {
    let mut buffer = games_ssd();
    // sector 1, first entry, shared high-bits byte
    buffer[256 + 8 + 6] = 255;
    let err = parse_single_sided_disk_image(&buffer).unwrap_err();
    assert_eq!("invalid start sector 770 reported in catalogue entry 0 (ASTDEL)", err.to_string());

    let mut buffer = games_ssd();
    buffer[256 + 8 + 7] = 1;
    assert!(matches!(
        parse_single_sided_disk_image(&buffer),
        Err(DfsError::InvalidStartSector { start_sector: 1, index: 0, .. })
    ));
}

#[test]
fn test_reject_double_sided_length() {
    let mut image = sigma_dsd();
    image.truncate(image.len() - BYTES_PER_SECTOR * SECTORS_PER_TRACK);
    let err = parse_double_sided_disk_image(&image).unwrap_err();
    assert_eq!("truncated DSD disk image (expected 204800 bytes, got 202240 bytes)", err.to_string());
}

#[test]
fn test_data_past_end_is_clamped() {
    let mut buffer = build_side("CLAMP", 0, 0, 40, &[ImageFile::new("BIG", 0, 0, pattern(10, 0))]);
    // start sector 399, length 1000
    buffer[256 + 8 + 4..256 + 8 + 6].copy_from_slice(&1000u16.to_le_bytes());
    buffer[256 + 8 + 6] = 0x01;
    buffer[256 + 8 + 7] = 0x8F;
    let side = parse_single_sided_disk_image(&buffer).unwrap();
    assert_eq!(BYTES_PER_SECTOR, side.files()[0].data.len());
}

#[test]
fn test_too_many_files() {
    let mut side = DfsDiskSide::new("FULL", 0);
    let file = File {
        name: "X".to_string(),
        dir: '$',
        is_locked: false,
        load_address: 0,
        execution_address: 0,
        data: Vec::new(),
    };
    for _ in 0..MAX_FILES {
        side.add_file(file.clone()).unwrap();
    }
    assert!(matches!(side.add_file(file), Err(DfsError::TooManyFiles)));
}

#[test]
fn test_catalogue_entry() {
    let buffer = games_ssd();
    let entry = CatalogueEntry::parse(&buffer, 2);
    assert_eq!("!MENU", entry.name);
    assert!(entry.is_locked);
    assert_eq!(700, entry.length);
    assert_eq!("$.!MENU   00001900 00008023      700 L/ 41", entry.to_string());
}

#[test]
fn test_field_helpers() {
    assert_eq!(56, bcd_to_number(0x56));
    assert_eq!(99, bcd_to_number(0x99));
    assert_eq!(0x3_1900, packed_field(0x1900, 0b0000_1100, 0b0000_1100, 14));
    assert_eq!(0x3_8023, packed_field(0x8023, 0b1100_0000, 0b1100_0000, 10));
    assert_eq!(0x0_1234, packed_field(0x1234, 0b1111_0011, 0b0000_1100, 14));
    assert_eq!(0x2FF, packed_field(0xFF, 0b10, 0b11, 8));
    assert!(BootOption::try_from(4).is_err());
    assert_eq!(BootOption::Run, BootOption::try_from(2).unwrap());
}

#[test]
fn test_extract_double_sided() {
    let [side0, side1] = parse_double_sided_disk_image(&sigma_dsd()).unwrap();
    let dir = tempfile::tempdir().unwrap();
    let side0_dir = dir.path().join("side0");
    let side1_dir = dir.path().join("side1");
    fs::create_dir(&side0_dir).unwrap();
    fs::create_dir(&side1_dir).unwrap();
    side0.extract_files(&side0_dir).unwrap();
    side1.extract_files(&side1_dir).unwrap();

    assert_eq!(pattern(260, 9), fs::read(side0_dir.join("C2LOAD")).unwrap());
    assert_eq!("C2LOAD     00031900 00038023\n", fs::read_to_string(side0_dir.join("C2LOAD.inf")).unwrap());
    assert_eq!(pattern(1023, 4), fs::read(side1_dir.join("WC6")).unwrap());
    assert_eq!("WC6        00037C00 00037C00\n", fs::read_to_string(side1_dir.join("WC6.inf")).unwrap());
    assert!(!side0_dir.join("WC6").exists());
    assert!(!side1_dir.join("C2LOAD").exists());

    assert_eq!(24 * 2, fs::read_dir(&side0_dir).unwrap().count());
    assert_eq!(7 * 2, fs::read_dir(&side1_dir).unwrap().count());
}

#[test]
fn test_extract_rejects_parent_name() {
    let image = build_side(
        "ESCAPE",
        0,
        0,
        40,
        &[ImageFile::new("SAFE", 0, 0, pattern(10, 0)), ImageFile::new("../ESC", 0, 0, pattern(10, 1))],
    );
    let side = parse_single_sided_disk_image(&image).unwrap();
    let dir = tempfile::tempdir().unwrap();
    let target = dir.path().join("target");
    fs::create_dir(&target).unwrap();

    let err = side.extract_files(&target).unwrap_err();
    assert!(matches!(&err, DfsError::UnsafeFileName { name, .. } if name == "../ESC"));
    assert_eq!("refusing to extract $.../ESC: '../ESC' is not a plain file name", err.to_string());
    assert!(!dir.path().join("ESC").exists());
    // nothing is written once any entry is refused
    assert_eq!(0, fs::read_dir(&target).unwrap().count());
}

#[test]
fn test_extract_rejects_separator_dir() {
    let image = build_side(
        "ROOTED",
        0,
        0,
        40,
        &[ImageFile {
            dir: '/',
            ..ImageFile::new("ROOTED", 0, 0, pattern(10, 0))
        }],
    );
    let side = parse_single_sided_disk_image(&image).unwrap();
    assert_eq!('/', side.files()[0].dir);

    let dir = tempfile::tempdir().unwrap();
    let err = side.extract_files(dir.path()).unwrap_err();
    assert!(matches!(&err, DfsError::UnsafeFileName { entry, name } if entry == "/.ROOTED" && name == "/"));
    assert_eq!(0, fs::read_dir(dir.path()).unwrap().count());
}

#[test]
fn test_extract_rejects_dot_names() {
    let dir = tempfile::tempdir().unwrap();
    for name in [".", "..", ""] {
        let mut side = DfsDiskSide::new("DOTS", 0);
        side.add_file(File {
            name: name.to_string(),
            dir: '$',
            is_locked: false,
            load_address: 0,
            execution_address: 0,
            data: Vec::new(),
        })
        .unwrap();
        assert!(matches!(side.extract_files(dir.path()), Err(DfsError::UnsafeFileName { .. })), "{name:?}");
    }
    assert_eq!(0, fs::read_dir(dir.path()).unwrap().count());
}
