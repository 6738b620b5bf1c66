mod csv_file;

pub use csv_file::{read_series, read_series_file, CsvIngestError};
