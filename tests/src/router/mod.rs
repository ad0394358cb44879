#[cfg(test)]
mod encrypted_roundtrip_test;
