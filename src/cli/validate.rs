use std::path::Path;
use std::str::FromStr;

pub fn path(rawpath: &str) -> Result<(), String> {
    match Path::new(&rawpath).exists() {
        true => Ok(()),
        false => Err(format!("{} doesn't exist or there is no permission to read it", rawpath)),
    }
}

pub fn numeric<T>(low: T, upper: T) -> impl Fn(&str) -> Result<(), String>
where
    T: FromStr + std::fmt::Display + std::cmp::PartialOrd + Copy,
{
    move |val: &str| -> Result<(), String> {
        let parsed = match val.parse::<T>() {
            Ok(parsed) => parsed,
            Err(_) => return Err(format!("failed to parse {}", val)),
        };
        if parsed < low || parsed > upper {
            return Err(format!("Value {} is expected to be inside [{}, {}] range", val, low, upper));
        }
        Ok(())
    }
}
