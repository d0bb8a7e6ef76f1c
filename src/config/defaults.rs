pub const TCIA_IMAGE_URL: &str =
    "https://services.cancerimagingarchive.net/services/v3/TCIA/query/getImage";

pub fn default_server_url() -> String {
    TCIA_IMAGE_URL.to_string()
}

pub fn default_njobs() -> usize {
    5
}

pub fn default_timeout_sec() -> u64 {
    600
}

pub fn default_max_retries() -> u32 {
    3
}

pub fn default_delay_ms() -> u64 {
    1000
}

pub fn default_multiplier() -> f64 {
    2.0
}

pub fn default_max_delay_ms() -> u64 {
    30_000
}

pub fn default_true() -> bool {
    true
}
