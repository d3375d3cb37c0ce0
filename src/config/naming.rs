//! Output file naming

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use serde::{Deserialize, Serialize};

/// File naming configuration
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NamingConfig {
    /// Append the resized dimensions to each file name, e.g. `img_300x200.png`
    pub postfix: bool,

    /// Put every output under a `<width>x<height>` folder of the output root
    pub resolution_folder: bool,
}

impl NamingConfig {
    /// Enable or disable the dimension postfix
    pub fn postfix(mut self, postfix: bool) -> Self {
        self.postfix = postfix;
        self
    }

    /// Enable or disable the resolution folder
    pub fn resolution_folder(mut self, enabled: bool) -> Self {
        self.resolution_folder = enabled;
        self
    }

    /// Output root for a run targeting `width` x `height`
    pub fn output_root(&self, output: &Path, width: u32, height: u32) -> PathBuf {
        if self.resolution_folder {
            output.join(format!("{}x{}", width, height))
        } else {
            output.to_path_buf()
        }
    }

    /// Output path relative to the output root.
    ///
    /// Only the optional postfix is inserted before the extension; parent
    /// directories, stem and extension of `relative_name` are kept as they
    /// are. The image is still encoded in its detected format whatever the
    /// extension says.
    pub fn output_name(&self, relative_name: &Path, (width, height): (u32, u32)) -> PathBuf {
        if !self.postfix {
            return relative_name.to_path_buf();
        }

        let mut file_name = relative_name
            .file_stem()
            .map(OsString::from)
            .unwrap_or_default();
        file_name.push(format!("_{}x{}", width, height));

        if let Some(extension) = relative_name.extension() {
            file_name.push(".");
            file_name.push(extension);
        }

        match relative_name.parent() {
            Some(parent) => parent.join(file_name),
            None => PathBuf::from(file_name),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_name_keeps_relative_path() {
        let naming = NamingConfig::default();
        let name = naming.output_name(Path::new("a/b/pic.png"), (10, 10));
        assert_eq!(name, PathBuf::from("a/b/pic.png"));
    }

    #[test]
    fn test_postfix_uses_dimensions() {
        let naming = NamingConfig::default().postfix(true);
        let name = naming.output_name(Path::new("pic.jpeg"), (300, 200));
        assert_eq!(name, PathBuf::from("pic_300x200.jpeg"));

        let name = naming.output_name(Path::new("dir/noext"), (4, 2));
        assert_eq!(name, PathBuf::from("dir/noext_4x2"));
    }

    #[test]
    fn test_source_extension_always_kept() {
        // A JPEG stored with a .png name must not land on a real photo.jpg
        for naming in [NamingConfig::default(), NamingConfig::default().postfix(true)] {
            let mislabeled = naming.output_name(Path::new("x/photo.png"), (1, 1));
            let genuine = naming.output_name(Path::new("x/photo.jpg"), (1, 1));
            assert_ne!(mislabeled, genuine);
            assert_eq!(mislabeled.extension().unwrap(), "png");
        }

        let naming = NamingConfig::default();
        assert_eq!(naming.output_name(Path::new("noext"), (1, 1)), PathBuf::from("noext"));
        assert_eq!(
            naming.output_name(Path::new("IMG_01.JPG"), (1, 1)),
            PathBuf::from("IMG_01.JPG")
        );
    }

    #[test]
    fn test_resolution_folder() {
        let naming = NamingConfig::default().resolution_folder(true);
        assert_eq!(
            naming.output_root(Path::new("out"), 1024, 0),
            PathBuf::from("out/1024x0")
        );

        let flat = NamingConfig::default();
        assert_eq!(flat.output_root(Path::new("out"), 1024, 0), PathBuf::from("out"));
    }
}
