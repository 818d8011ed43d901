//! Writing simulator images to disk.

use crate::{FlightError, Result};
use sim_client::ImageResponse;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use time::OffsetDateTime;

/// Save an image as `<type>_<unix-ms>.png` (compressed responses are already
/// PNG) or `.ppm` (raw RGB). Returns the path written.
pub fn save_image(dir: &Path, image: &ImageResponse) -> Result<PathBuf> {
    if image.data.is_empty() {
        return Err(FlightError::NoImage);
    }
    fs::create_dir_all(dir)?;

    let ext = if image.compressed { "png" } else { "ppm" };
    let millis = OffsetDateTime::now_utc().unix_timestamp_nanos() / 1_000_000;
    let stem = format!("{}_{}", image.image_type.as_str(), millis);
    let mut path = dir.join(format!("{stem}.{ext}"));
    let mut n = 1;
    while path.exists() {
        path = dir.join(format!("{stem}-{n}.{ext}"));
        n += 1;
    }

    let mut file = fs::File::create(&path)?;
    if image.compressed {
        file.write_all(&image.data)?;
    } else {
        write_ppm(&mut file, image)?;
    }
    file.flush()?;
    Ok(path)
}

fn write_ppm(out: &mut impl Write, image: &ImageResponse) -> Result<()> {
    let expected = image.width as usize * image.height as usize * 3;
    if image.data.len() != expected {
        return Err(FlightError::Io(io::Error::new(
            io::ErrorKind::InvalidData,
            format!(
                "{}x{} RGB needs {} bytes, got {}",
                image.width,
                image.height,
                expected,
                image.data.len()
            ),
        )));
    }
    write!(out, "P6\n{} {}\n255\n", image.width, image.height)?;
    out.write_all(&image.data)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use sim_client::ImageType;

    fn image(compressed: bool, data: Vec<u8>) -> ImageResponse {
        ImageResponse {
            camera_name: "0".into(),
            image_type: ImageType::Scene,
            width: 2,
            height: 1,
            data,
            compressed,
            timestamp: OffsetDateTime::now_utc(),
        }
    }

    #[test]
    fn raw_rgb_becomes_ppm() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let path = save_image(dir.path(), &image(false, vec![1, 2, 3, 4, 5, 6]))?;
        assert_eq!(path.extension().and_then(|e| e.to_str()), Some("ppm"));
        assert!(path
            .file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|n| n.starts_with("scene_")));
        let bytes = fs::read(&path)?;
        assert!(bytes.starts_with(b"P6\n2 1\n255\n"));
        assert_eq!(&bytes[bytes.len() - 6..], &[1, 2, 3, 4, 5, 6]);
        Ok(())
    }

    #[test]
    fn compressed_data_is_written_verbatim() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let first = save_image(dir.path(), &image(true, b"\x89PNG".to_vec()))?;
        let second = save_image(dir.path(), &image(true, b"\x89PNG".to_vec()))?;
        assert_ne!(first, second);
        assert_eq!(fs::read(&first)?, b"\x89PNG");
        Ok(())
    }

    #[test]
    fn empty_or_short_images_fail() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            save_image(dir.path(), &image(false, vec![])),
            Err(FlightError::NoImage)
        ));
        assert!(save_image(dir.path(), &image(false, vec![0; 5])).is_err());
    }
}
