// Adapters: file readers/writers and HTTP clients behind the app ports

pub mod airport_table;
pub mod csv_export;
pub mod google_places_client;
pub mod json_export;
pub mod master_csv;
pub mod overpass_client;
pub mod pexels_client;
pub mod source_reader;
pub mod supabase_sink;
pub mod wikidata_client;

pub use airport_table::AirportTable;
pub use google_places_client::GooglePlacesClient;
pub use overpass_client::OverpassClient;
pub use pexels_client::PexelsClient;
pub use supabase_sink::SupabaseSink;
pub use wikidata_client::WikidataClient;
