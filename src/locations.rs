use directories::BaseDirs;
use std::path::PathBuf;

pub fn default_data_dir() -> PathBuf {
    let base_dirs: BaseDirs = BaseDirs::new().unwrap();
    let data_dir = base_dirs.data_dir().join("vterm");
    if !data_dir.exists() {
        std::fs::create_dir_all(&data_dir).unwrap();
    }
    data_dir
}
