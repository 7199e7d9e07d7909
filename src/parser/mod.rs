pub mod header_parser;
pub mod midi_parser;
pub mod note_pairing;
pub mod primitive_parser;
pub mod track_parser;
