#![allow(dead_code)]

use sdg_report::config::AppConfig;
use std::io::{Cursor, Read};
use std::path::{Path, PathBuf};

/// Indicator 3.2 with two sub categories whose values rise every year and
/// reach the target of 60 in 2020, plus an indicator of goal 4 with no data.
pub const MORTALITY_CSV: &str = "\
Sl No.,Indicator Number,Indicator,Sub Category,Target Year,Target Value,Department,2016,2017,2018,2019,2020
1,3.2,Under-five mortality,Urban,2030,60,Health,20,30,40,50,60
2,3.2,Under-five mortality,Rural,2030,60,Health,15,25,35,45,65
3,4.1,Completion rate,,2030,,Education,,,,,
";

pub fn config() -> AppConfig {
    let mut config = AppConfig::default();
    config.loader.years = (2016..=2020).collect();
    config.chart.width = 480;
    config.chart.height = 320;
    config
}

pub fn write_fixture(dir: &Path, name: &str, contents: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, contents).unwrap();
    path
}

pub fn zip_part(bytes: &[u8], name: &str) -> String {
    let mut archive = zip::ZipArchive::new(Cursor::new(bytes)).unwrap();
    let mut file = archive.by_name(name).unwrap();
    let mut s = String::new();
    file.read_to_string(&mut s).unwrap();
    s
}

pub fn zip_names(bytes: &[u8]) -> Vec<String> {
    let archive = zip::ZipArchive::new(Cursor::new(bytes)).unwrap();
    let mut names: Vec<String> = archive.file_names().map(str::to_string).collect();
    names.sort();
    names
}
