//! Prints bucket indices and lookups for the reference sample keys.

use digest_hashmap::{digest, ChainingHashMap};

fn main() -> digest_hashmap::Result<()> {
    let mut m: ChainingHashMap<String, i32> = ChainingHashMap::new();

    for k in ["sdf", "asdf", "asdfs", "asd2342342f"] {
        println!("{:>20} -> bucket {}", k, digest::bucket_index(k, m.capacity())?);
    }
    println!("-----------------------------");

    let samples = [
        ("sdf", 1),
        ("asdf", 2),
        ("asdfs", 3),
        ("asd2342342f", 4),
        ("sdf2222222", 10),
        ("asdf2222222", 20),
        ("asdfs2222222", 30),
        ("asd2342342f2222222", 40),
    ];
    for (k, v) in samples {
        m.try_set(k.to_string(), v)?;
    }
    println!("-----------------------------");

    for k in ["sdf", "asdf", "asdf2222222", "asd2342342f", "non-existent"] {
        match m.try_get(k)? {
            Some(v) => println!("{:>20} = {}", k, v),
            None => println!("{:>20} is absent", k),
        }
    }
    println!("{} entries in {} buckets", m.len(), m.capacity());
    Ok(())
}
