use std::time::Duration;

use scope_transport::mock::MockTransport;
use scope_transport::scpi::{get_block, get_opc};
use scope_transport::ScpiTransport;

#[test]
fn reads_a_full_block() {
    let mut payload = vec![0xABu8; 1400];
    let mut wire = b"#41400".to_vec();
    wire.append(&mut payload.clone());
    wire.push(b'\n');

    let mut t = MockTransport::new().expect(":WAV:DATA?", wire);
    t.send(":WAV:DATA?").unwrap();
    let got = get_block(&mut t, Duration::from_secs(1), 1_000_000).unwrap();
    assert_eq!(got, payload);
}

#[test]
fn get_opc_succeeds_on_one() {
    let mut t = MockTransport::new().expect("*OPC?", "1\n".as_bytes().to_vec());
    get_opc(&mut t, Duration::from_secs(1)).unwrap();
}

#[test]
fn get_opc_fails_on_other_reply() {
    let mut t = MockTransport::new().expect("*OPC?", "0\n".as_bytes().to_vec());
    assert!(get_opc(&mut t, Duration::from_secs(1)).is_err());
}
