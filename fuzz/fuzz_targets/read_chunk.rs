#![no_main]

use chunkio::{read_chunk, ChunkConfig, Stream};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let config = ChunkConfig::default().with_max_data_size(1 << 20);

    let mut stream = Stream::from_ro_memory(data);
    while read_chunk(&mut stream, &config).is_ok() {}

    let mut owned = data.to_vec();
    let mut stream = Stream::from_vec(&mut owned);
    let _ = read_chunk(&mut stream, &ChunkConfig::big_endian().with_max_data_size(1 << 20));
});
