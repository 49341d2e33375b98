use flate2::read::GzDecoder;
use std::fs::File;
use std::io::{self, BufReader};
use std::path::Path;
use tar::Archive;

/// Unpack a gzipped tarball into `dest`.
pub fn extract_tgz(archive: &Path, dest: &Path) -> io::Result<()> {
    let file = File::open(archive)?;
    Archive::new(GzDecoder::new(BufReader::new(file))).unpack(dest)
}

#[cfg(test)]
pub(crate) fn write_tgz(path: &Path, files: &[(&str, &[u8])]) -> io::Result<()> {
    use flate2::write::GzEncoder;
    use flate2::Compression;
    use tar::{Builder, Header};

    let mut builder = Builder::new(GzEncoder::new(File::create(path)?, Compression::fast()));
    for &(name, data) in files {
        let mut header = Header::new_gnu();
        header.set_size(data.len() as u64);
        header.set_mode(0o0644);
        builder.append_data(&mut header, name, data)?;
    }
    builder.into_inner()?.finish()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_extract() {
        let dir = tempfile::tempdir().unwrap();
        let archive = dir.path().join("HG38-PLUS.tgz");
        write_tgz(
            &archive,
            &[
                ("HG38-PLUS/reference.json", &b"{}"[..]),
                ("HG38-PLUS/fasta/genome.fa", &b">chr1\nACGT\n"[..]),
            ],
        )
        .unwrap();
        let dest = dir.path().join("genome");
        extract_tgz(&archive, &dest).unwrap();
        assert_eq!(
            std::fs::read_to_string(dest.join("HG38-PLUS/fasta/genome.fa")).unwrap(),
            ">chr1\nACGT\n"
        );
    }

    #[test]
    fn test_corrupt_archive() {
        let dir = tempfile::tempdir().unwrap();
        let archive = dir.path().join("bad.tgz");
        std::fs::write(&archive, b"not a tarball").unwrap();
        assert!(extract_tgz(&archive, dir.path()).is_err());
    }
}
